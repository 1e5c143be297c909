use tracing::warn;

use super::entity::{Entity, EntityId, EntityKind, EntityStore};
use super::input::Command;
use super::world::{TileBehavior, TileWorld, Vec2};

/// Horizontal speeds below this settle to zero instead of decaying forever.
const STOP_SPEED_PX_S: f32 = 1.0;

/// Movement constants, in pixels and seconds. Callers scale by the fixed
/// tick length, so the same tuning works at any tick rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicsTuning {
    pub gravity_px_s2: f32,
    pub terminal_fall_px_s: f32,
    pub walk_speed_px_s: f32,
    pub jump_speed_px_s: f32,
    /// Per-tick horizontal velocity retention while no move key is held.
    pub ground_momentum: f32,
    /// Solid-pair overlaps at or below this depth are left alone.
    pub overlap_tolerance_px: f32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity_px_s2: 720.0,
            terminal_fall_px_s: 180.0,
            walk_speed_px_s: 96.0,
            jump_speed_px_s: 240.0,
            ground_momentum: 0.8,
            overlap_tolerance_px: 0.5,
        }
    }
}

/// Unordered overlap between two live entities, reported in spawn order
/// (`first` spawned before `second`). Gameplay decides what it means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contact {
    pub first: EntityId,
    pub second: EntityId,
}

/// An entity overlapping a behavior tile after movement resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileTouch {
    pub entity: EntityId,
    pub behavior: TileBehavior,
}

/// Everything one physics tick observed. Consumed by the scene update in the
/// same frame; the step itself never applies gameplay rules.
#[derive(Debug, Clone, Default)]
pub struct StepReport {
    pub contacts: Vec<Contact>,
    pub tile_touches: Vec<TileTouch>,
    /// Entities removed because their position went non-finite.
    pub removed_non_finite: Vec<EntityId>,
}

/// Advances every live entity by one fixed tick: intent, gravity, then
/// axis-by-axis tile resolution, horizontal before vertical. The command
/// applies only to the player; enemies keep their patrol velocity and items
/// are inert.
pub fn step_world(
    tiles: &TileWorld,
    store: &mut EntityStore,
    command: Command,
    tuning: &PhysicsTuning,
    dt: f32,
) -> StepReport {
    let mut report = StepReport::default();

    for index in 0..store.slots().len() {
        let mut entity = store.slots()[index].clone();
        if !entity.alive() {
            continue;
        }
        let previous_position = entity.position;

        match entity.kind {
            EntityKind::Player => {
                entity.velocity.x *= tuning.ground_momentum;
                if entity.velocity.x.abs() < STOP_SPEED_PX_S {
                    entity.velocity.x = 0.0;
                }
                if command.left {
                    entity.velocity.x = -tuning.walk_speed_px_s;
                    entity.facing_right = false;
                } else if command.right {
                    entity.velocity.x = tuning.walk_speed_px_s;
                    entity.facing_right = true;
                }
                // Grounded state is the previous tick's verdict; airborne
                // jump presses do nothing.
                if command.jump && entity.grounded {
                    entity.velocity.y = -tuning.jump_speed_px_s;
                }
                entity.velocity.y =
                    (entity.velocity.y + tuning.gravity_px_s2 * dt).min(tuning.terminal_fall_px_s);
            }
            EntityKind::Enemy => {
                entity.velocity.y =
                    (entity.velocity.y + tuning.gravity_px_s2 * dt).min(tuning.terminal_fall_px_s);
            }
            EntityKind::Item => {}
        }

        if entity.kind != EntityKind::Item {
            resolve_axes(tiles, &mut entity, dt);
            if entity.velocity.x.abs() > f32::EPSILON {
                entity.anim_tick = entity.anim_tick.wrapping_add(1);
            }
        }

        let non_finite = !entity.position.x.is_finite() || !entity.position.y.is_finite();
        if non_finite {
            entity.position = previous_position;
            entity.velocity = Vec2::ZERO;
            warn!(entity_id = entity.id.0, "entity_position_non_finite");
            report.removed_non_finite.push(entity.id);
        }

        clamp_to_level(tiles, &mut entity.position, entity.size);

        for behavior in [TileBehavior::Hazard, TileBehavior::Goal] {
            if tiles.behavior_in_rect_px(
                entity.position.x,
                entity.position.y,
                entity.size.x,
                entity.size.y,
                behavior,
            ) {
                report.tile_touches.push(TileTouch {
                    entity: entity.id,
                    behavior,
                });
            }
        }

        let id = entity.id;
        store.slots_mut()[index] = entity;
        if non_finite {
            store.destroy(id);
        }
    }

    collect_contacts(tiles, store, tuning, &mut report);
    report
}

/// Moves one entity, one axis at a time, snapping to the nearest tile edge
/// on solid contact. Downward contact sets `grounded` for the next tick.
fn resolve_axes(tiles: &TileWorld, entity: &mut Entity, dt: f32) {
    let ts = tiles.tile_size_px() as f32;

    let new_x = entity.position.x + entity.velocity.x * dt;
    if entity.velocity.x != 0.0
        && tiles.solid_in_rect_px(new_x, entity.position.y, entity.size.x, entity.size.y)
    {
        if entity.velocity.x > 0.0 {
            entity.position.x = ((new_x + entity.size.x) / ts).floor() * ts - entity.size.x;
        } else {
            entity.position.x = ((new_x / ts).floor() + 1.0) * ts;
        }
        if entity.kind == EntityKind::Enemy {
            // Patrol reversal: bounce off walls instead of stopping.
            entity.velocity.x = -entity.velocity.x;
            entity.facing_right = entity.velocity.x >= 0.0;
        } else {
            entity.velocity.x = 0.0;
        }
    } else {
        entity.position.x = new_x;
    }

    entity.grounded = false;
    let new_y = entity.position.y + entity.velocity.y * dt;
    if entity.velocity.y != 0.0
        && tiles.solid_in_rect_px(entity.position.x, new_y, entity.size.x, entity.size.y)
    {
        if entity.velocity.y > 0.0 {
            entity.position.y = ((new_y + entity.size.y) / ts).floor() * ts - entity.size.y;
            entity.grounded = true;
        } else {
            entity.position.y = ((new_y / ts).floor() + 1.0) * ts;
        }
        entity.velocity.y = 0.0;
    } else {
        entity.position.y = new_y;
    }
}

fn clamp_to_level(tiles: &TileWorld, position: &mut Vec2, size: Vec2) {
    position.x = position.x.clamp(0.0, (tiles.pixel_width() - size.x).max(0.0));
    position.y = position.y.clamp(0.0, (tiles.pixel_height() - size.y).max(0.0));
}

/// Overlap extents of two rects on both axes, or `None` when disjoint.
fn rect_overlap(a_pos: Vec2, a_size: Vec2, b_pos: Vec2, b_size: Vec2) -> Option<Vec2> {
    let x = (a_pos.x + a_size.x).min(b_pos.x + b_size.x) - a_pos.x.max(b_pos.x);
    let y = (a_pos.y + a_size.y).min(b_pos.y + b_size.y) - a_pos.y.max(b_pos.y);
    if x > 0.0 && y > 0.0 {
        Some(Vec2::new(x, y))
    } else {
        None
    }
}

/// Records every overlapping live pair and pushes solid pairs apart along
/// the axis of least penetration. The later-spawned entity moves; a push
/// that would land it outside the level or inside a solid tile is undone,
/// leaving the overlap for the next tick.
fn collect_contacts(
    tiles: &TileWorld,
    store: &mut EntityStore,
    tuning: &PhysicsTuning,
    report: &mut StepReport,
) {
    let len = store.slots().len();
    for i in 0..len {
        for j in (i + 1)..len {
            let (a, b) = {
                let slots = store.slots();
                (&slots[i], &slots[j])
            };
            if !a.alive() || !b.alive() {
                continue;
            }
            let Some(overlap) = rect_overlap(a.position, a.size, b.position, b.size) else {
                continue;
            };
            report.contacts.push(Contact {
                first: a.id,
                second: b.id,
            });

            if a.solid && b.solid && overlap.x.min(overlap.y) > tuning.overlap_tolerance_px {
                let push_right = b.center().x >= a.center().x;
                let push_down = b.center().y >= a.center().y;
                let slots = store.slots_mut();
                let mover = &mut slots[j];
                let before_push = mover.position;
                if overlap.x <= overlap.y {
                    mover.position.x += if push_right { overlap.x } else { -overlap.x };
                } else {
                    mover.position.y += if push_down { overlap.y } else { -overlap.y };
                }
                clamp_to_level(tiles, &mut mover.position, mover.size);
                if tiles.solid_in_rect_px(
                    mover.position.x,
                    mover.position.y,
                    mover.size.x,
                    mover.size.y,
                ) {
                    mover.position = before_push;
                }
            }
        }
    }
}
