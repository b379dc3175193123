//! Gallery Walk
//!
//! A walkable art gallery where a handful of visitors wander between the
//! paintings on their own. Point the crosshair at a painting to step up to
//! it, click again for its details, or click a visitor who is standing
//! still to hear what they think of the art.

mod app;
mod assets;
mod chat;
mod config;
mod focus;
mod render;
mod scene;
mod ui;
mod visitors;
mod world;

use app::AppError;
use config::GalleryConfig;
use scene::serialization::{default_layout, load_layout_from_file};

fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(err) = run() {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let config = GalleryConfig::load()?;
    let layout = match &config.layout_path {
        Some(path) => {
            log::info!("Loading gallery layout from {}", path.display());
            load_layout_from_file(path)?
        }
        None => default_layout()?,
    };

    log::info!("Gallery Walk");
    log::info!("   Click to look around, WASD to walk, Esc to close or exit");
    app::run(config, &layout)
}
