pub mod types;
pub mod config;
pub mod template;
pub mod bracket;
pub mod picks;
pub mod server;

use config::*;
use picks::PickStore;
use server::AppState;
use types::*;

use std::{
    fs,
    sync::{Arc, Mutex},
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ── Entry point ────────────────────────────────────────────────────────

pub async fn run() {
    load_env_file();

    // Initialize tracing with a daily rolling log file
    let logs_dir = repo_root().join("logs");
    fs::create_dir_all(&logs_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();
    info!("Bracket pick'em server starting");

    let config = match load_config_inner() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}; using default config");
            apply_env_defaults(AppConfig::default())
        }
    };
    log_env_warnings(&config);

    // An invalid template is fatal: the server must not run without a
    // validated topology.
    let template = match template::load_template(&config) {
        Ok(template) => template,
        Err(e) => {
            error!("refusing to start: {e}");
            return;
        }
    };
    info!(
        "loaded bracket template \"{}\" ({} entrants, {} matchups)",
        template.name(),
        template.entrants().len(),
        template.matchups().len()
    );

    let picks_dir = resolve_repo_path(&config.picks_dir);
    let ui_dir = resolve_repo_path(&config.ui_dir);
    fs::create_dir_all(&picks_dir).ok();
    fs::create_dir_all(&ui_dir).ok();

    let store: SharedPickStore = Arc::new(Mutex::new(PickStore::new(picks_dir, config.log_picks)));
    let state = AppState {
        template: Arc::new(template),
        store,
    };

    server::start_server(state, ui_dir, &config.listen_addr).await;
}
