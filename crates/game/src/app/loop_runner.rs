use std::process::ExitCode;

use engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    info!(
        title = %app.config.window_title,
        width = app.config.window_width,
        height = app.config.window_height,
        "window_config"
    );
    if let Err(err) = run_app(app.config, app.images, app.scene) {
        error!(error = %err, "game_failed");
        return ExitCode::FAILURE;
    }

    info!("clean_exit");
    ExitCode::SUCCESS
}
