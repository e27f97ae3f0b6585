use macroquad::prelude::*;
use macroquad_tile_editor::{EditorApp, EditorConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn config_path() -> Option<PathBuf> {
    std::env::args().nth(1).map(PathBuf::from)
}

fn window_conf() -> Conf {
    let cfg = EditorConfig::load_or_default(config_path().as_deref()).unwrap_or_default();
    Conf {
        window_title: "Tile Map Editor".into(),
        window_width: cfg.window_width,
        window_height: cfg.window_height,
        ..Default::default()
    }
}

async fn run() -> anyhow::Result<()> {
    let config = EditorConfig::load_or_default(config_path().as_deref())?;
    tracing::info!(resources = %config.resource_dir.display(), "starting editor");
    let mut app = EditorApp::new(config)?;

    loop {
        if is_key_pressed(KeyCode::Escape) {
            return Ok(());
        }
        app.frame();
        next_frame().await;
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = run().await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}
