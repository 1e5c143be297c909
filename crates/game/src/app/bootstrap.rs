use std::fs;
use std::path::Path;

use engine::{resolve_app_paths, LoopConfig, PhysicsTuning, Scene};
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::gameplay::{self, GameplayTuning};

const CONFIG_FILE: &str = "game.json";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

/// Optional tuning file at `config/game.json`. Every field has a default,
/// so a missing file runs the stock game and a partial file overrides only
/// what it names.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct GameConfig {
    pub window_title: String,
    pub window_scale: u32,
    pub target_tps: u32,
    pub entity_cap: usize,
    pub max_render_fps: Option<u32>,
    pub gravity_px_s2: f32,
    pub terminal_fall_px_s: f32,
    pub walk_speed_px_s: f32,
    pub jump_speed_px_s: f32,
    pub ground_momentum: f32,
    pub enemy_patrol_px_s: f32,
    pub stomp_bounce_px_s: f32,
    pub coin_score: u32,
    pub stomp_score: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        let physics = PhysicsTuning::default();
        Self {
            window_title: "Pipeworks".to_string(),
            window_scale: 3,
            target_tps: 60,
            entity_cap: 128,
            max_render_fps: None,
            gravity_px_s2: physics.gravity_px_s2,
            terminal_fall_px_s: physics.terminal_fall_px_s,
            walk_speed_px_s: physics.walk_speed_px_s,
            jump_speed_px_s: physics.jump_speed_px_s,
            ground_momentum: physics.ground_momentum,
            enemy_patrol_px_s: 48.0,
            stomp_bounce_px_s: 160.0,
            coin_score: 100,
            stomp_score: 200,
        }
    }
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!("=== Pipeworks Startup ===");

    let config_path = resolve_app_paths()
        .ok()
        .map(|paths| paths.config_dir.join(CONFIG_FILE));
    let game_config = load_game_config(config_path.as_deref());

    let tuning = PhysicsTuning {
        gravity_px_s2: game_config.gravity_px_s2,
        terminal_fall_px_s: game_config.terminal_fall_px_s,
        walk_speed_px_s: game_config.walk_speed_px_s,
        jump_speed_px_s: game_config.jump_speed_px_s,
        ground_momentum: game_config.ground_momentum,
        ..PhysicsTuning::default()
    };
    let gameplay_tuning = GameplayTuning {
        enemy_patrol_px_s: game_config.enemy_patrol_px_s,
        stomp_bounce_px_s: game_config.stomp_bounce_px_s,
        coin_score: game_config.coin_score,
        stomp_score: game_config.stomp_score,
    };

    let config = LoopConfig {
        window_title: game_config.window_title.clone(),
        window_scale: game_config.window_scale,
        target_tps: game_config.target_tps,
        entity_cap: game_config.entity_cap,
        max_render_fps: game_config.max_render_fps,
        tuning,
        ..LoopConfig::default()
    };

    AppWiring {
        config,
        scene: Box::new(gameplay::build_scene(gameplay_tuning)),
    }
}

/// Reads the config file if it exists. Malformed content falls back to
/// defaults with a warning that names the offending field path.
pub(crate) fn load_game_config(path: Option<&Path>) -> GameConfig {
    let Some(path) = path else {
        warn!("config_dir_unresolved; using default game config");
        return GameConfig::default();
    };
    match fs::read_to_string(path) {
        Ok(contents) => parse_game_config(&contents, path),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            info!(path = %path.display(), "game_config_absent; using defaults");
            GameConfig::default()
        }
        Err(error) => {
            warn!(path = %path.display(), error = %error, "game_config_unreadable; using defaults");
            GameConfig::default()
        }
    }
}

fn parse_game_config(contents: &str, path: &Path) -> GameConfig {
    let mut deserializer = serde_json::Deserializer::from_str(contents);
    match serde_path_to_error::deserialize(&mut deserializer) {
        Ok(config) => {
            info!(path = %path.display(), "game_config_loaded");
            config
        }
        Err(error) => {
            warn!(
                path = %path.display(),
                field = %error.path(),
                error = %error.inner(),
                "game_config_malformed; using defaults"
            );
            GameConfig::default()
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
