mod entity;
mod input;
mod loop_runner;
mod metrics;
mod physics;
mod rendering;
mod scene;
pub(crate) mod world;

pub use entity::{Entity, EntityId, EntityKind, EntitySpawn, EntityStore, EntityStoreError, EntityVisual};
pub use input::{Command, InputAction, InputSnapshot};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, SessionPhase};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use physics::{step_world, Contact, PhysicsTuning, StepReport, TileTouch};
pub use rendering::{world_to_screen_px, Renderer, Viewport};
pub use scene::{EndReason, GameWorld, Scene, SceneCommand};
pub use world::{
    Camera, MarkerKind, SpawnPoint, Tile, TileBehavior, TileLayer, TileWorld, TileWorldError, Vec2,
};
