/// The platformer session: spawns the level's entities, scores coins and
/// stomps, and ends the session on defeat, goal, or fault.
pub(crate) struct PlatformScene {
    tuning: GameplayTuning,
    progress: SessionProgress,
    player_id: Option<EntityId>,
}

impl PlatformScene {
    pub(crate) fn new(tuning: GameplayTuning) -> Self {
        Self {
            tuning,
            progress: SessionProgress::default(),
            player_id: None,
        }
    }
}

impl Scene for PlatformScene {
    fn load(&mut self, world: &mut GameWorld) {
        self.progress = SessionProgress::default();
        self.player_id = spawn_level_entities(world, &self.tuning);
        if self.player_id.is_none() {
            warn!("level_spawned_no_player");
        }
        info!(
            markers = world.spawn_points().len(),
            staged = world.entities().effective_count(),
            "scene_loaded"
        );
    }

    fn update(
        &mut self,
        _dt: f32,
        _input: &InputSnapshot,
        step: &StepReport,
        world: &mut GameWorld,
    ) -> SceneCommand {
        let Some(player_id) = self.player_id else {
            return SceneCommand::GameOver(EndReason::Fault("no player spawned".into()));
        };
        resolve_step(world, step, &self.tuning, &mut self.progress, player_id)
    }

    fn hud_lines(&self, _world: &GameWorld) -> Vec<String> {
        vec![
            format!("SCORE: {}", self.progress.score),
            format!("COINS: {}", self.progress.coins),
        ]
    }

    fn unload(&mut self, _world: &mut GameWorld) {
        info!(
            score = self.progress.score,
            coins = self.progress.coins,
            "scene_unloaded"
        );
    }
}
