/// Score and rule constants the scene runs with. Built from the game config
/// at startup; fixed for the session after that.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct GameplayTuning {
    pub enemy_patrol_px_s: f32,
    pub stomp_bounce_px_s: f32,
    pub coin_score: u32,
    pub stomp_score: u32,
}

impl Default for GameplayTuning {
    fn default() -> Self {
        Self {
            enemy_patrol_px_s: 48.0,
            stomp_bounce_px_s: 160.0,
            coin_score: 100,
            stomp_score: 200,
        }
    }
}

/// Per-session progress shown on the HUD.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct SessionProgress {
    pub score: u32,
    pub coins: u32,
}

impl SessionProgress {
    fn award_coin(&mut self, tuning: &GameplayTuning) {
        self.coins = self.coins.saturating_add(1);
        self.score = self.score.saturating_add(tuning.coin_score);
    }

    fn award_stomp(&mut self, tuning: &GameplayTuning) {
        self.score = self.score.saturating_add(tuning.stomp_score);
    }
}

fn spawn_for_marker(point: &SpawnPoint, tile_size_px: u32, tuning: &GameplayTuning) -> EntitySpawn {
    let position = point.world_position(tile_size_px);
    match point.kind {
        MarkerKind::Player => EntitySpawn {
            kind: EntityKind::Player,
            // Feet on the marker tile's floor, horizontally centered.
            position: Vec2 {
                x: position.x + (tile_size_px as f32 - PLAYER_SIZE.x) * 0.5,
                y: position.y + tile_size_px as f32 - PLAYER_SIZE.y,
            },
            velocity: Vec2 { x: 0.0, y: 0.0 },
            size: PLAYER_SIZE,
            solid: false,
            visual: EntityVisual {
                base_code: PLAYER_BASE_CODE,
                walk_frames: PLAYER_WALK_FRAMES,
            },
        },
        MarkerKind::Enemy => EntitySpawn {
            kind: EntityKind::Enemy,
            position,
            velocity: Vec2 {
                x: -tuning.enemy_patrol_px_s,
                y: 0.0,
            },
            size: ENEMY_SIZE,
            solid: true,
            visual: EntityVisual {
                base_code: ENEMY_BASE_CODE,
                walk_frames: ENEMY_WALK_FRAMES,
            },
        },
        MarkerKind::Coin => EntitySpawn {
            kind: EntityKind::Item,
            position,
            velocity: Vec2 { x: 0.0, y: 0.0 },
            size: COIN_SIZE,
            solid: false,
            visual: EntityVisual {
                base_code: COIN_CODE,
                walk_frames: 1,
            },
        },
    }
}
