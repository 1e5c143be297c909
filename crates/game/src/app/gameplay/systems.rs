/// Populates the world from the level's spawn markers. Returns the player id
/// when one was created; markers past the entity cap are skipped with a
/// warning rather than aborting the level.
fn spawn_level_entities(world: &mut GameWorld, tuning: &GameplayTuning) -> Option<EntityId> {
    let tile_size = world.tiles().tile_size_px();
    let points: Vec<SpawnPoint> = world.spawn_points().to_vec();
    let mut player_id = None;
    for point in &points {
        let spawn = spawn_for_marker(point, tile_size, tuning);
        let kind = spawn.kind;
        match world.entities_mut().create(spawn) {
            Ok(id) => {
                if kind == EntityKind::Player {
                    player_id = Some(id);
                }
            }
            Err(err) => {
                warn!(
                    ?kind,
                    tile_x = point.tile_x,
                    tile_y = point.tile_y,
                    error = %err,
                    "spawn_marker_skipped"
                );
            }
        }
    }
    player_id
}

/// Applies gameplay rules to one tick's physics report. Defeat outranks a
/// goal touch when both land on the same tick.
fn resolve_step(
    world: &mut GameWorld,
    step: &StepReport,
    tuning: &GameplayTuning,
    progress: &mut SessionProgress,
    player_id: EntityId,
) -> SceneCommand {
    if step.removed_non_finite.contains(&player_id) {
        warn!("player_position_diverged");
        return SceneCommand::GameOver(EndReason::Fault("player position diverged".into()));
    }

    let mut defeated = false;

    for contact in &step.contacts {
        let other = if contact.first == player_id {
            contact.second
        } else if contact.second == player_id {
            contact.first
        } else {
            continue;
        };
        // The same contact may coexist with an earlier destroy this tick;
        // destroyed entities no longer resolve.
        let (other_kind, other_top, other_height) = match world.entities().get(other) {
            Ok(entity) => (entity.kind, entity.position.y, entity.size.y),
            Err(_) => continue,
        };
        match other_kind {
            EntityKind::Item => {
                world.entities_mut().destroy(other);
                progress.award_coin(tuning);
                info!(coins = progress.coins, score = progress.score, "coin_collected");
            }
            EntityKind::Enemy => {
                let (player_feet_y, player_vy) = match world.entities().get(player_id) {
                    Ok(player) => (player.position.y + player.size.y, player.velocity.y),
                    Err(_) => continue,
                };
                if is_stomp(player_feet_y, player_vy, other_top, other_height) {
                    world.entities_mut().destroy(other);
                    progress.award_stomp(tuning);
                    if let Ok(player) = world.entities_mut().get_mut(player_id) {
                        player.velocity.y = -tuning.stomp_bounce_px_s;
                        player.grounded = false;
                    }
                    info!(score = progress.score, "enemy_stomped");
                } else {
                    defeated = true;
                }
            }
            EntityKind::Player => {}
        }
    }

    let mut goal_reached = false;
    for touch in &step.tile_touches {
        if touch.entity != player_id {
            continue;
        }
        match touch.behavior {
            TileBehavior::Hazard => defeated = true,
            TileBehavior::Goal => goal_reached = true,
        }
    }

    if defeated {
        world.entities_mut().destroy(player_id);
        info!(score = progress.score, "player_defeated");
        return SceneCommand::GameOver(EndReason::PlayerDefeated);
    }
    if goal_reached {
        info!(score = progress.score, coins = progress.coins, "level_complete");
        return SceneCommand::GameOver(EndReason::LevelComplete);
    }
    SceneCommand::None
}

fn is_stomp(player_feet_y: f32, player_vy: f32, enemy_top: f32, enemy_height: f32) -> bool {
    player_vy > 0.0 && player_feet_y <= enemy_top + enemy_height * STOMP_MIDLINE_FRACTION
}
