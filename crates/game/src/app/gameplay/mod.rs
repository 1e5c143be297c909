use engine::{
    EndReason, EntityId, EntityKind, EntitySpawn, EntityVisual, GameWorld, InputSnapshot,
    MarkerKind, Scene, SceneCommand, SpawnPoint, StepReport, TileBehavior, Vec2,
};
use tracing::{info, warn};

/// Sprite codes in the bundled atlas. Entity rows sit below the tile rows;
/// a missing atlas falls back to flat colors and these become labels only.
const PLAYER_BASE_CODE: u16 = 16;
const PLAYER_WALK_FRAMES: u8 = 2;
const ENEMY_BASE_CODE: u16 = 19;
const ENEMY_WALK_FRAMES: u8 = 2;
const COIN_CODE: u16 = 18;

const PLAYER_SIZE: Vec2 = Vec2 { x: 6.0, y: 8.0 };
const ENEMY_SIZE: Vec2 = Vec2 { x: 8.0, y: 8.0 };
const COIN_SIZE: Vec2 = Vec2 { x: 8.0, y: 8.0 };

/// A falling player squashes an enemy only while its feet are above this
/// fraction of the enemy's height; anything lower is a side hit.
const STOMP_MIDLINE_FRACTION: f32 = 0.65;

include!("types.rs");
include!("systems.rs");
include!("scene_impl.rs");

pub(crate) fn build_scene(tuning: GameplayTuning) -> PlatformScene {
    PlatformScene::new(tuning)
}
