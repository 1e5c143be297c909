use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    run_app, run_app_with_metrics, step_world, world_to_screen_px, AppError, Camera, Command,
    Contact, EndReason, Entity, EntityId, EntityKind, EntitySpawn, EntityStore, EntityStoreError,
    EntityVisual, GameWorld, InputSnapshot, LoopConfig, LoopMetricsSnapshot, MarkerKind,
    MetricsHandle, PhysicsTuning, Scene, SceneCommand, SessionPhase, SpawnPoint, StepReport, Tile,
    TileBehavior, TileLayer, TileTouch, TileWorld, TileWorldError, Vec2, Viewport,
};
pub use content::{load_bundle, Bundle, LevelData, LoadError, SoundBank, TileAtlas};

pub const ROOT_ENV_VAR: &str = "PIPEWORKS_ROOT";

/// Directories the runtime reads from. The bundle directory holds the level,
/// atlas, and sound files consumed once at load.
#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub bundle_dir: PathBuf,
    pub config_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "{env_var} is set but does not point to a valid project root: {path}\n\
A valid root must contain Cargo.toml and an assets/ directory."
    )]
    InvalidEnvRoot {
        path: PathBuf,
        env_var: &'static str,
    },
    #[error(
        "could not detect project root by walking upward from executable directory: {start_dir}\n\
Expected a directory containing Cargo.toml and assets/. Set {env_var} explicitly."
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
    },
}

pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let root = resolve_root()?;
    Ok(AppPaths {
        bundle_dir: root.join("assets").join("base"),
        config_dir: root.join("config"),
        root,
    })
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let normalized = normalize_path(Path::new(&value));
            if is_repo_marker(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    path: normalized,
                    env_var: ROOT_ENV_VAR,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_repo_marker(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_repo_marker(path: &Path) -> bool {
    path.join("Cargo.toml").is_file() && path.join("assets").is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
