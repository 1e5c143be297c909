use std::collections::HashSet;
use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use tracing::warn;
use winit::window::Window;

use crate::app::entity::Entity;
use crate::app::scene::GameWorld;
use crate::app::world::{Camera, Tile, TileBehavior, TileLayer, Vec2};
use crate::content::TileAtlas;

use super::hud;
use super::transform::{world_to_screen_px, Viewport};

const CLEAR_COLOR: [u8; 4] = [46, 58, 92, 255];
const TILE_FALLBACK_SOLID_COLOR: [u8; 4] = [112, 83, 58, 255];
const TILE_FALLBACK_HAZARD_COLOR: [u8; 4] = [196, 64, 52, 255];
const TILE_FALLBACK_GOAL_COLOR: [u8; 4] = [228, 196, 64, 255];
const TILE_FALLBACK_DECOR_COLOR: [u8; 4] = [74, 112, 56, 255];
const ENTITY_FALLBACK_COLOR: [u8; 4] = [220, 220, 240, 255];
const ALPHA_DISCARD_THRESHOLD: u8 = 8;
/// Ticks of horizontal movement per walk animation frame.
const WALK_ANIM_TICKS_PER_FRAME: u32 = 6;
const HUD_MARGIN_PX: i32 = 4;
const BANNER_PAD_PX: i32 = 3;

/// Software renderer over a fixed logical framebuffer. The surface scales
/// the buffer to the window; gameplay coordinates never depend on window
/// size. Reads the world, never mutates it.
pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
    atlas: Option<TileAtlas>,
    warned_missing_codes: HashSet<u16>,
    draw_order: Vec<usize>,
}

impl Renderer {
    pub fn new(
        window: Arc<Window>,
        logical_width: u32,
        logical_height: u32,
        atlas: Option<TileAtlas>,
    ) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(
            Arc::clone(&window),
            logical_width,
            logical_height,
            size.width.max(1),
            size.height.max(1),
        )?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: logical_width,
                height: logical_height,
            },
            atlas,
            warned_missing_codes: HashSet::new(),
            draw_order: Vec::new(),
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize_surface(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(
            Arc::clone(&self.window),
            self.viewport.width,
            self.viewport.height,
            width,
            height,
        )?;
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        logical_width: u32,
        logical_height: u32,
        surface_width: u32,
        surface_height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(surface_width, surface_height, window);
        Pixels::new(logical_width, logical_height, surface)
    }

    /// Draws one frame: background tiles, entities sorted by (y, spawn
    /// order), foreground tiles, then HUD text and the optional banner.
    pub(crate) fn render_world(
        &mut self,
        world: &GameWorld,
        hud_lines: &[String],
        banner: Option<&str>,
    ) -> Result<(), Error> {
        let width = self.viewport.width;
        let height = self.viewport.height;
        if width == 0 || height == 0 {
            return Ok(());
        }

        let camera = world.camera();
        let atlas = self.atlas.as_ref();
        let warned = &mut self.warned_missing_codes;
        let frame = self.pixels.frame_mut();

        for chunk in frame.chunks_exact_mut(4) {
            chunk.copy_from_slice(&CLEAR_COLOR);
        }

        draw_tile_layer(frame, width, height, world, camera, TileLayer::Background, atlas, warned);

        collect_sorted_entity_indices(world, &mut self.draw_order);
        for index in self.draw_order.iter().copied() {
            let entity = &world.entities().slots()[index];
            draw_entity(frame, width, height, camera, entity, atlas, warned);
        }

        draw_tile_layer(frame, width, height, world, camera, TileLayer::Foreground, atlas, warned);

        let mut text_y = HUD_MARGIN_PX;
        for line in hud_lines {
            hud::draw_text(frame, width, height, HUD_MARGIN_PX, text_y, line);
            text_y += hud::LINE_ADVANCE;
        }

        if let Some(text) = banner {
            draw_banner(frame, width, height, text);
        }

        self.pixels.render()
    }
}

/// Live entity indices ordered back to front: lower bounding-box bottom
/// first, spawn order breaking ties.
fn collect_sorted_entity_indices(world: &GameWorld, out: &mut Vec<usize>) {
    let slots = world.entities().slots();
    out.clear();
    out.extend(
        slots
            .iter()
            .enumerate()
            .filter(|(_, entity)| entity.alive())
            .map(|(index, _)| index),
    );
    out.sort_by(|&a, &b| {
        let (ea, eb) = (&slots[a], &slots[b]);
        let bottom_a = ea.position.y + ea.size.y;
        let bottom_b = eb.position.y + eb.size.y;
        bottom_a
            .total_cmp(&bottom_b)
            .then(ea.spawn_order().cmp(&eb.spawn_order()))
    });
}

#[allow(clippy::too_many_arguments)]
fn draw_tile_layer(
    frame: &mut [u8],
    width: u32,
    height: u32,
    world: &GameWorld,
    camera: Camera,
    layer: TileLayer,
    atlas: Option<&TileAtlas>,
    warned: &mut HashSet<u16>,
) {
    let tiles = world.tiles();
    let ts = tiles.tile_size_px();
    let first_x = (camera.position.x / ts as f32).floor().max(0.0) as u32;
    let first_y = (camera.position.y / ts as f32).floor().max(0.0) as u32;
    let last_x = (first_x + width / ts + 2).min(tiles.width());
    let last_y = (first_y + height / ts + 2).min(tiles.height());

    for tile_y in first_y..last_y {
        for tile_x in first_x..last_x {
            let Ok(tile) = tiles.tile_at(tile_x, tile_y) else {
                continue;
            };
            if tile.code == 0 || tile.layer != layer {
                continue;
            }
            let (screen_x, screen_y) = world_to_screen_px(
                Vec2::new((tile_x * ts) as f32, (tile_y * ts) as f32),
                camera,
            );
            draw_sprite(
                frame,
                width,
                height,
                screen_x,
                screen_y,
                ts as i32,
                tile.code,
                false,
                tile_fallback_color(tile),
                atlas,
                warned,
            );
        }
    }
}

fn draw_entity(
    frame: &mut [u8],
    width: u32,
    height: u32,
    camera: Camera,
    entity: &Entity,
    atlas: Option<&TileAtlas>,
    warned: &mut HashSet<u16>,
) {
    let (screen_x, screen_y) = world_to_screen_px(entity.position, camera);
    let code = entity_frame_code(entity);
    draw_sprite(
        frame,
        width,
        height,
        screen_x,
        screen_y,
        entity.size.x.round().max(1.0) as i32,
        code,
        !entity.facing_right,
        ENTITY_FALLBACK_COLOR,
        atlas,
        warned,
    );
}

/// Atlas code for the entity's current animation frame. Static sprites and
/// entities standing still use the base code.
fn entity_frame_code(entity: &Entity) -> u16 {
    let frames = u32::from(entity.visual.walk_frames.max(1));
    if frames == 1 || entity.velocity.x.abs() <= f32::EPSILON {
        return entity.visual.base_code;
    }
    let frame = (entity.anim_tick / WALK_ANIM_TICKS_PER_FRAME) % frames;
    entity.visual.base_code.saturating_add(frame as u16)
}

/// Blits one atlas cell, or a filled square when no atlas is present or the
/// code falls outside it. Unknown codes warn once per code.
#[allow(clippy::too_many_arguments)]
fn draw_sprite(
    frame: &mut [u8],
    width: u32,
    height: u32,
    screen_x: i32,
    screen_y: i32,
    side_px: i32,
    code: u16,
    flip_x: bool,
    fallback_color: [u8; 4],
    atlas: Option<&TileAtlas>,
    warned: &mut HashSet<u16>,
) {
    if let Some(atlas) = atlas {
        match atlas.sprite_origin(code) {
            Some((origin_x, origin_y)) => {
                blit_atlas_cell(
                    frame, width, height, screen_x, screen_y, atlas, origin_x, origin_y, flip_x,
                );
                return;
            }
            None => {
                if warned.insert(code) {
                    warn!(code, "sprite_code_missing_from_atlas");
                }
            }
        }
    }
    hud::draw_filled_rect(frame, width, height, screen_x, screen_y, side_px, side_px, fallback_color);
}

#[allow(clippy::too_many_arguments)]
fn blit_atlas_cell(
    frame: &mut [u8],
    width: u32,
    height: u32,
    screen_x: i32,
    screen_y: i32,
    atlas: &TileAtlas,
    origin_x: u32,
    origin_y: u32,
    flip_x: bool,
) {
    let side = atlas.tile_size_px();
    for source_y in 0..side {
        let pixel_y = screen_y + source_y as i32;
        if pixel_y < 0 || pixel_y >= height as i32 {
            continue;
        }
        for source_x in 0..side {
            let pixel_x = screen_x + source_x as i32;
            if pixel_x < 0 || pixel_x >= width as i32 {
                continue;
            }
            let sample_x = if flip_x { side - 1 - source_x } else { source_x };
            let color = atlas.pixel(origin_x + sample_x, origin_y + source_y);
            if color[3] < ALPHA_DISCARD_THRESHOLD {
                continue;
            }
            let offset = (pixel_y as usize * width as usize + pixel_x as usize) * 4;
            if offset + 4 <= frame.len() {
                frame[offset..offset + 4].copy_from_slice(&color);
            }
        }
    }
}

fn tile_fallback_color(tile: Tile) -> [u8; 4] {
    match tile.behavior {
        Some(TileBehavior::Hazard) => TILE_FALLBACK_HAZARD_COLOR,
        Some(TileBehavior::Goal) => TILE_FALLBACK_GOAL_COLOR,
        None if tile.solid => TILE_FALLBACK_SOLID_COLOR,
        None => TILE_FALLBACK_DECOR_COLOR,
    }
}

/// Centered text on a dark plate, for PAUSED and session-end states.
fn draw_banner(frame: &mut [u8], width: u32, height: u32, text: &str) {
    let text_width = hud::text_width_px(text);
    let x = (width as i32 - text_width) / 2;
    let y = height as i32 / 2 - 3;
    hud::draw_filled_rect(
        frame,
        width,
        height,
        x - BANNER_PAD_PX,
        y - BANNER_PAD_PX,
        text_width + BANNER_PAD_PX * 2,
        5 + BANNER_PAD_PX * 2,
        hud::BANNER_BG_COLOR,
    );
    hud::draw_text(frame, width, height, x, y, text);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::entity::{EntitySpawn, EntityKind, EntityStore, EntityVisual};
    use crate::app::world::TileWorld;

    fn world_with_entities(spawns: Vec<EntitySpawn>) -> GameWorld {
        let tiles = TileWorld::new(10, 10, 8, vec![Tile::EMPTY; 100]).expect("tiles");
        let mut world = GameWorld::from_parts(tiles, Vec::new(), 32);
        for spawn in spawns {
            world.entities_mut().create(spawn).expect("spawn");
        }
        world.apply_pending();
        world
    }

    fn spawn_at(y: f32) -> EntitySpawn {
        EntitySpawn {
            kind: EntityKind::Item,
            position: Vec2::new(0.0, y),
            velocity: Vec2::ZERO,
            size: Vec2::new(8.0, 8.0),
            solid: false,
            visual: EntityVisual::still(1),
        }
    }

    #[test]
    fn draw_order_sorts_by_bottom_edge_then_spawn_order() {
        let world = world_with_entities(vec![spawn_at(40.0), spawn_at(8.0), spawn_at(8.0)]);
        let mut order = Vec::new();
        collect_sorted_entity_indices(&world, &mut order);
        assert_eq!(order, vec![1, 2, 0]);
    }

    #[test]
    fn draw_order_skips_destroyed_entities() {
        let mut world = world_with_entities(vec![spawn_at(0.0), spawn_at(8.0)]);
        let first = world.entities().slots()[0].id;
        world.entities_mut().destroy(first);

        let mut order = Vec::new();
        collect_sorted_entity_indices(&world, &mut order);
        assert_eq!(order, vec![1]);
    }

    #[test]
    fn still_entities_use_the_base_frame() {
        let world = world_with_entities(vec![EntitySpawn {
            visual: EntityVisual {
                base_code: 16,
                walk_frames: 2,
            },
            ..spawn_at(0.0)
        }]);
        let entity = &world.entities().slots()[0];
        assert_eq!(entity_frame_code(entity), 16);
    }

    #[test]
    fn walking_entities_alternate_frames() {
        let mut world = world_with_entities(vec![EntitySpawn {
            velocity: Vec2::new(50.0, 0.0),
            visual: EntityVisual {
                base_code: 16,
                walk_frames: 2,
            },
            ..spawn_at(0.0)
        }]);
        {
            let entity = &mut world.entities_mut().slots_mut()[0];
            entity.anim_tick = 0;
        }
        assert_eq!(entity_frame_code(&world.entities().slots()[0]), 16);
        {
            let entity = &mut world.entities_mut().slots_mut()[0];
            entity.anim_tick = WALK_ANIM_TICKS_PER_FRAME;
        }
        assert_eq!(entity_frame_code(&world.entities().slots()[0]), 17);
        {
            let entity = &mut world.entities_mut().slots_mut()[0];
            entity.anim_tick = WALK_ANIM_TICKS_PER_FRAME * 2;
        }
        assert_eq!(entity_frame_code(&world.entities().slots()[0]), 16);
    }

    #[test]
    fn fallback_colors_reflect_tile_role() {
        let solid = Tile {
            code: 1,
            solid: true,
            behavior: None,
            layer: TileLayer::Background,
        };
        let hazard = Tile {
            behavior: Some(TileBehavior::Hazard),
            ..solid
        };
        let goal = Tile {
            behavior: Some(TileBehavior::Goal),
            ..solid
        };
        assert_eq!(tile_fallback_color(solid), TILE_FALLBACK_SOLID_COLOR);
        assert_eq!(tile_fallback_color(hazard), TILE_FALLBACK_HAZARD_COLOR);
        assert_eq!(tile_fallback_color(goal), TILE_FALLBACK_GOAL_COLOR);
    }

    #[test]
    fn sprite_without_atlas_draws_fallback_square() {
        let mut frame = vec![0u8; 16 * 16 * 4];
        let mut warned = HashSet::new();
        draw_sprite(
            &mut frame,
            16,
            16,
            0,
            0,
            8,
            5,
            false,
            ENTITY_FALLBACK_COLOR,
            None,
            &mut warned,
        );
        assert_eq!(&frame[0..4], &ENTITY_FALLBACK_COLOR);
        assert!(warned.is_empty());
    }
}
