use super::entity::EntityStore;
use super::input::InputSnapshot;
use super::physics::StepReport;
use super::world::{Camera, SpawnPoint, TileWorld, Vec2};
use crate::content::LevelData;

/// Why a running session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndReason {
    PlayerDefeated,
    LevelComplete,
    /// Internal inconsistency, e.g. the player entity disappeared without a
    /// recorded defeat. Carries a short diagnostic.
    Fault(String),
}

impl EndReason {
    /// Short uppercase label for the end-of-session banner.
    pub fn banner(&self) -> &str {
        match self {
            EndReason::PlayerDefeated => "GAME OVER",
            EndReason::LevelComplete => "LEVEL COMPLETE",
            EndReason::Fault(_) => "SESSION FAULT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    GameOver(EndReason),
}

/// Everything that changes frame to frame: the immutable tile grid, the
/// entity store, and the camera. One per session.
#[derive(Debug)]
pub struct GameWorld {
    tiles: TileWorld,
    spawn_points: Vec<SpawnPoint>,
    entities: EntityStore,
    camera: Camera,
    tick: u64,
}

impl GameWorld {
    pub fn from_level(level: LevelData, entity_cap: usize) -> Self {
        Self::from_parts(level.tiles, level.spawn_points, entity_cap)
    }

    /// Direct construction for tests and headless drivers.
    pub fn from_parts(
        tiles: TileWorld,
        spawn_points: Vec<SpawnPoint>,
        entity_cap: usize,
    ) -> Self {
        Self {
            tiles,
            spawn_points,
            entities: EntityStore::with_cap(entity_cap),
            camera: Camera::default(),
            tick: 0,
        }
    }

    pub fn tiles(&self) -> &TileWorld {
        &self.tiles
    }

    pub fn spawn_points(&self) -> &[SpawnPoint] {
        &self.spawn_points
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// Split borrow for the physics step, which reads the grid while
    /// mutating the entity store.
    pub fn tiles_and_entities_mut(&mut self) -> (&TileWorld, &mut EntityStore) {
        (&self.tiles, &mut self.entities)
    }

    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    /// Ticks advanced since the session started running. Pause stops it.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn apply_pending(&mut self) {
        self.entities.apply_pending();
    }

    pub(crate) fn advance_tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    /// Re-centers the camera on the player, if one exists. Stays put
    /// otherwise so the view does not snap around on player death.
    pub(crate) fn update_camera(&mut self, view_size: Vec2) {
        let Some(player_id) = self.entities.player_id() else {
            return;
        };
        let Ok(player) = self.entities.get(player_id) else {
            return;
        };
        let target = player.center();
        let world_size = Vec2::new(self.tiles.pixel_width(), self.tiles.pixel_height());
        self.camera.follow(target, view_size, world_size);
    }
}

/// Gameplay hook driven by the loop. The engine owns movement, collision,
/// and drawing; scenes own rules: what a contact means, when the session
/// ends, what the HUD says.
pub trait Scene {
    /// Called once after the bundle loads, before the first tick. Spawns
    /// from `world.spawn_points()` happen here.
    fn load(&mut self, world: &mut GameWorld);

    /// Called once per fixed tick while the session is running, after the
    /// physics step and before staged entity changes commit.
    fn update(
        &mut self,
        dt: f32,
        input: &InputSnapshot,
        step: &StepReport,
        world: &mut GameWorld,
    ) -> SceneCommand;

    /// Text lines for the HUD, drawn top-left in order.
    fn hud_lines(&self, _world: &GameWorld) -> Vec<String> {
        Vec::new()
    }

    /// Called once when the loop shuts down.
    fn unload(&mut self, world: &mut GameWorld);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::entity::{EntitySpawn, EntityKind, EntityVisual};
    use crate::app::input::Command;
    use crate::app::physics::{step_world, PhysicsTuning};
    use crate::app::world::Tile;

    fn open_world(width: u32, height: u32) -> GameWorld {
        let tiles = TileWorld::new(width, height, 8, vec![Tile::EMPTY; (width * height) as usize])
            .expect("tiles");
        GameWorld::from_parts(tiles, Vec::new(), 16)
    }

    #[test]
    fn camera_tracks_the_player() {
        let mut world = open_world(100, 30);
        world
            .entities_mut()
            .create(EntitySpawn {
                kind: EntityKind::Player,
                position: Vec2::new(400.0, 120.0),
                velocity: Vec2::ZERO,
                size: Vec2::new(6.0, 8.0),
                solid: false,
                visual: EntityVisual::still(16),
            })
            .expect("player");
        world.apply_pending();

        world.update_camera(Vec2::new(320.0, 240.0));
        let camera = world.camera();
        assert!((camera.position.x - (403.0 - 160.0)).abs() < 1e-3);
        assert_eq!(camera.position.y, 0.0);
    }

    #[test]
    fn camera_holds_still_without_a_player() {
        let mut world = open_world(100, 30);
        world.update_camera(Vec2::new(320.0, 240.0));
        assert_eq!(world.camera().position, Vec2::ZERO);
    }

    #[test]
    fn split_borrow_drives_the_physics_step() {
        let mut world = open_world(20, 12);
        let id = world
            .entities_mut()
            .create(EntitySpawn {
                kind: EntityKind::Player,
                position: Vec2::new(40.0, 16.0),
                velocity: Vec2::ZERO,
                size: Vec2::new(6.0, 8.0),
                solid: false,
                visual: EntityVisual::still(16),
            })
            .expect("player");
        world.apply_pending();

        let (tiles, entities) = world.tiles_and_entities_mut();
        let report = step_world(
            tiles,
            entities,
            Command::default(),
            &PhysicsTuning::default(),
            1.0 / 60.0,
        );
        assert!(report.removed_non_finite.is_empty());
        // Gravity moved the player through the shared reference.
        assert!(world.entities().get(id).expect("player").position.y > 16.0);
    }

    #[test]
    fn end_reason_banners() {
        assert_eq!(EndReason::PlayerDefeated.banner(), "GAME OVER");
        assert_eq!(EndReason::LevelComplete.banner(), "LEVEL COMPLETE");
        assert_eq!(EndReason::Fault("x".into()).banner(), "SESSION FAULT");
    }
}
