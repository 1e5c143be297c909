use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::content::{load_bundle, LoadError};
use crate::{resolve_app_paths, StartupError};

use super::metrics::MetricsAccumulator;
use super::physics::{step_world, PhysicsTuning};
use super::scene::{EndReason, GameWorld, Scene, SceneCommand};
use super::{InputAction, InputSnapshot, MetricsHandle, Renderer};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    /// Logical framebuffer size; the window opens at this times
    /// `window_scale` and the surface stretches to fit after resizes.
    pub logical_width: u32,
    pub logical_height: u32,
    pub window_scale: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
    pub entity_cap: usize,
    /// Asset bundle directory. Resolved from the app root when unset.
    pub bundle_dir: Option<PathBuf>,
    pub tuning: PhysicsTuning,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Pipeworks".to_string(),
            logical_width: 320,
            logical_height: 240,
            window_scale: 3,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: None,
            entity_cap: 128,
            bundle_dir: None,
            tuning: PhysicsTuning::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load asset bundle: {0}")]
    Load(#[from] LoadError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Lifecycle of one play session. Ticks only advance in `Running`; `Paused`
/// freezes simulation but keeps drawing; `GameOver` keeps the final frame
/// and banner up until the player quits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionPhase {
    Loading,
    Running,
    Paused,
    GameOver(EndReason),
    Shutdown,
}

impl SessionPhase {
    fn name(&self) -> &'static str {
        match self {
            SessionPhase::Loading => "loading",
            SessionPhase::Running => "running",
            SessionPhase::Paused => "paused",
            SessionPhase::GameOver(_) => "game_over",
            SessionPhase::Shutdown => "shutdown",
        }
    }

    fn banner(&self) -> Option<&str> {
        match self {
            SessionPhase::Paused => Some("PAUSED"),
            SessionPhase::GameOver(reason) => Some(reason.banner()),
            _ => None,
        }
    }
}

/// Pause toggles between `Running` and `Paused`; every other phase ignores
/// the pause key.
fn toggle_pause(phase: SessionPhase) -> SessionPhase {
    match phase {
        SessionPhase::Running => SessionPhase::Paused,
        SessionPhase::Paused => SessionPhase::Running,
        other => other,
    }
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>) -> Result<(), AppError> {
    run_app_with_metrics(config, scene, MetricsHandle::default())
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    mut scene: Box<dyn Scene>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let mut phase = SessionPhase::Loading;
    info!(phase = phase.name(), "session_phase");

    let bundle_dir = match config.bundle_dir.clone() {
        Some(dir) => dir,
        None => {
            let app_paths = resolve_app_paths()?;
            info!(
                root = %app_paths.root.display(),
                bundle_dir = %app_paths.bundle_dir.display(),
                "startup"
            );
            app_paths.bundle_dir
        }
    };
    let bundle = load_bundle(&bundle_dir)?;
    let mut world = GameWorld::from_level(bundle.level, config.entity_cap);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window_scale = config.window_scale.max(1);
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                (config.logical_width * window_scale) as f64,
                (config.logical_height * window_scale) as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(
        Arc::clone(&window),
        config.logical_width.max(1),
        config.logical_height.max(1),
        bundle.atlas,
    )
    .map_err(AppError::CreateRenderer)?;
    let view_size = renderer.viewport().size();

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let tuning = config.tuning;
    let mut input_collector = InputCollector::default();

    scene.load(&mut world);
    world.apply_pending();
    world.update_camera(view_size);
    phase = SessionPhase::Running;
    info!(
        phase = phase.name(),
        entity_count = world.entities().live_count(),
        "session_phase"
    );

    info!(
        target_tps,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        entity_cap = config.entity_cap,
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let window_for_loop = Arc::clone(&window);

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window_for_loop.id() => {
                match event {
                    WindowEvent::CloseRequested => {
                        input_collector.mark_quit_requested();
                        info!(reason = "window_close", "shutdown_requested");
                        phase = SessionPhase::Shutdown;
                        window_target.exit();
                    }
                    WindowEvent::Resized(new_size) => {
                        if let Err(error) = renderer.resize_surface(new_size.width, new_size.height)
                        {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::ScaleFactorChanged { .. } => {
                        let size = window_for_loop.inner_size();
                        if let Err(error) = renderer.resize_surface(size.width, size.height) {
                            warn!(error = %error, "renderer_resize_failed");
                            window_target.exit();
                        }
                    }
                    WindowEvent::KeyboardInput { event, .. } => {
                        input_collector.handle_keyboard_input(&event);
                        if input_collector.quit_requested {
                            info!(reason = "escape_key", "shutdown_requested");
                            phase = SessionPhase::Shutdown;
                            window_target.exit();
                        }
                    }
                    WindowEvent::RedrawRequested => {
                        let now = Instant::now();
                        let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                        last_frame_instant = now;

                        let clamped_frame_dt = clamp_frame_delta(raw_frame_dt, max_frame_delta);
                        accumulator = accumulator.saturating_add(clamped_frame_dt);

                        let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                        for _ in 0..step_plan.ticks_to_run {
                            let input_snapshot = input_collector.snapshot_for_tick();
                            if input_snapshot.pause_pressed() {
                                let next = toggle_pause(phase.clone());
                                if next != phase {
                                    phase = next;
                                    info!(phase = phase.name(), "session_phase");
                                }
                            }
                            if phase != SessionPhase::Running {
                                continue;
                            }

                            let report = {
                                let (tiles, entities) = world.tiles_and_entities_mut();
                                step_world(
                                    tiles,
                                    entities,
                                    input_snapshot.command(),
                                    &tuning,
                                    fixed_dt_seconds,
                                )
                            };
                            let command = scene.update(
                                fixed_dt_seconds,
                                &input_snapshot,
                                &report,
                                &mut world,
                            );
                            world.apply_pending();
                            world.update_camera(view_size);
                            world.advance_tick();
                            metrics_accumulator.record_tick();

                            match command {
                                SceneCommand::GameOver(reason) => {
                                    phase = SessionPhase::GameOver(reason);
                                    info!(
                                        phase = phase.name(),
                                        tick = world.tick(),
                                        "session_phase"
                                    );
                                }
                                SceneCommand::None => {
                                    // The scene is the authority on defeat; a
                                    // missing player without a verdict is a bug
                                    // worth surfacing, not a crash.
                                    if world.entities().player_id().is_none() {
                                        warn!("player_entity_missing");
                                        phase = SessionPhase::GameOver(EndReason::Fault(
                                            "player entity missing".to_string(),
                                        ));
                                    }
                                }
                            }
                        }
                        accumulator = step_plan.remaining_accumulator;

                        if step_plan.dropped_backlog > Duration::ZERO {
                            metrics_accumulator.record_dropped_ticks(
                                (step_plan.dropped_backlog.as_secs_f64() / fixed_dt.as_secs_f64())
                                    as u32,
                            );
                            warn!(
                                dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                                max_ticks_per_frame, "sim_clamp_triggered"
                            );
                        }

                        // Single authoritative FPS cap sleep point.
                        let elapsed_since_last_present =
                            Instant::now().saturating_duration_since(last_present_instant);
                        let cap_sleep =
                            compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                        if cap_sleep > Duration::ZERO {
                            thread::sleep(cap_sleep);
                        }

                        let hud_lines = scene.hud_lines(&world);
                        if let Err(error) =
                            renderer.render_world(&world, &hud_lines, phase.banner())
                        {
                            warn!(error = %error, "renderer_draw_failed");
                            window_target.exit();
                        }
                        last_present_instant = Instant::now();
                        metrics_accumulator.record_frame(raw_frame_dt);

                        if let Some(snapshot) = metrics_accumulator
                            .maybe_snapshot(now, world.entities().live_count())
                        {
                            metrics_handle.publish(snapshot);
                            info!(
                                fps = snapshot.fps,
                                tps = snapshot.tps,
                                frame_time_ms = snapshot.frame_time_ms,
                                dropped_ticks = snapshot.dropped_ticks,
                                entity_count = snapshot.live_entities,
                                phase = phase.name(),
                                "loop_metrics"
                            );
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                window_for_loop.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload(&mut world);
                info!(phase = SessionPhase::Shutdown.name(), "session_phase");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    pause_key_is_down: bool,
    pause_pressed_edge: bool,
    action_states: super::input::ActionStates,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
        if matches!(key_event.physical_key, PhysicalKey::Code(KeyCode::KeyP)) {
            self.handle_pause_key_state(key_event.state);
        }
    }

    fn handle_pause_key_state(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.pause_key_is_down {
                    self.pause_pressed_edge = true;
                }
                self.pause_key_is_down = true;
            }
            ElementState::Released => self.pause_key_is_down = false,
        }
    }

    /// Consumes the edge flags; held keys persist via the action states.
    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.action_states.command(),
            self.pause_pressed_edge,
            self.quit_requested,
        );
        self.pause_pressed_edge = false;
        snapshot
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        match key {
            PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
                self.action_states.set(InputAction::MoveLeft, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
                self.action_states.set(InputAction::MoveRight, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyW)
            | PhysicalKey::Code(KeyCode::ArrowUp)
            | PhysicalKey::Code(KeyCode::Space) => {
                self.action_states.set(InputAction::Jump, is_pressed);
            }
            PhysicalKey::Code(KeyCode::KeyX) => {
                self.action_states.set(InputAction::Action, is_pressed);
            }
            PhysicalKey::Code(KeyCode::Escape) => {
                if is_pressed {
                    self.mark_quit_requested();
                }
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(48), fixed_dt, 5);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let fixed_dt = Duration::from_millis(16);
        let result = plan_sim_steps(Duration::from_millis(120), fixed_dt, 3);

        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn pause_toggles_between_running_and_paused_only() {
        assert_eq!(toggle_pause(SessionPhase::Running), SessionPhase::Paused);
        assert_eq!(toggle_pause(SessionPhase::Paused), SessionPhase::Running);
        assert_eq!(toggle_pause(SessionPhase::Loading), SessionPhase::Loading);
        assert_eq!(
            toggle_pause(SessionPhase::GameOver(EndReason::PlayerDefeated)),
            SessionPhase::GameOver(EndReason::PlayerDefeated)
        );
        assert_eq!(toggle_pause(SessionPhase::Shutdown), SessionPhase::Shutdown);
    }

    #[test]
    fn phase_banners() {
        assert_eq!(SessionPhase::Running.banner(), None);
        assert_eq!(SessionPhase::Paused.banner(), Some("PAUSED"));
        assert_eq!(
            SessionPhase::GameOver(EndReason::LevelComplete).banner(),
            Some("LEVEL COMPLETE")
        );
    }

    #[test]
    fn pause_press_is_edge_triggered_for_single_tick() {
        let mut input = InputCollector::default();
        input.handle_pause_key_state(ElementState::Pressed);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();
        assert!(first.pause_pressed());
        assert!(!second.pause_pressed());
    }

    #[test]
    fn held_pause_key_does_not_spam_edges() {
        let mut input = InputCollector::default();

        input.handle_pause_key_state(ElementState::Pressed);
        assert!(input.snapshot_for_tick().pause_pressed());

        input.handle_pause_key_state(ElementState::Pressed);
        assert!(!input.snapshot_for_tick().pause_pressed());

        input.handle_pause_key_state(ElementState::Released);
        input.handle_pause_key_state(ElementState::Pressed);
        assert!(input.snapshot_for_tick().pause_pressed());
    }

    #[test]
    fn movement_keys_map_to_command_fields() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::ArrowLeft), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Space), true);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.command().left);
        assert!(snapshot.command().jump);
        assert!(!snapshot.command().right);
    }

    #[test]
    fn key_release_clears_held_command() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), true);
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::KeyD), false);

        assert!(!input.snapshot_for_tick().command().right);
    }

    #[test]
    fn escape_marks_quit_for_every_later_snapshot() {
        let mut input = InputCollector::default();
        input.update_action_state_from_physical_key(PhysicalKey::Code(KeyCode::Escape), true);

        assert!(input.snapshot_for_tick().quit_requested());
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn target_frame_duration_none_when_cap_off() {
        assert_eq!(target_frame_duration(None), None);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(Some(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(Some(60)));
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }
}
