use crate::scene::GalleryLayout;
use std::path::Path;

const DEFAULT_LAYOUT: &str = include_str!("../../assets/gallery.json");

#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LayoutError>;

pub fn default_layout() -> Result<GalleryLayout> {
    Ok(serde_json::from_str(DEFAULT_LAYOUT)?)
}

#[cfg(test)]
pub fn save_layout_to_file(layout: &GalleryLayout, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(layout)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_layout_from_file(path: &Path) -> Result<GalleryLayout> {
    let json = std::fs::read_to_string(path)?;
    let layout: GalleryLayout = serde_json::from_str(&json)?;
    Ok(layout)
}
