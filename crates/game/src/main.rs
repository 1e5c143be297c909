use engine::run_app;
use tracing::error;

mod app;

fn main() {
    let wiring = app::bootstrap::build_app();
    if let Err(err) = run_app(wiring.config, wiring.scene) {
        error!(error = %err, "startup_failed");
        std::process::exit(1);
    }
}
