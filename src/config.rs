use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "GALLERY_CONFIG";
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const CHAT_MODEL_ENV: &str = "GALLERY_CHAT_MODEL";
pub const CHAT_ENDPOINT_ENV: &str = "GALLERY_CHAT_ENDPOINT";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    pub interaction: InteractionConfig,
    pub visitors: VisitorConfig,
    pub chat: ChatConfig,
    pub camera: CameraConfig,
    pub layout_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    pub max_pick_distance: f32,
    pub focus_distance: f32,
    pub focus_duration_secs: f32,
    /// World units per second.
    pub move_speed: f32,
    /// Radians per pixel of mouse motion.
    pub look_sensitivity: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_pick_distance: 7.0,
            focus_distance: 2.0,
            focus_duration_secs: 1.0,
            move_speed: 9.0,
            look_sensitivity: 0.002,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorConfig {
    pub countdown_min_ms: u64,
    pub countdown_max_ms: u64,
    pub walk_duration_secs: f32,
    /// Distance in front of an artwork where visitors stop.
    pub stand_distance: f32,
    pub lateral_radius: f32,
    pub lateral_step_radians: f32,
    pub hop_height: f32,
    /// Hops per second of animation time.
    pub hop_rate: f32,
    pub spawn_spread: f32,
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            countdown_min_ms: 3000,
            countdown_max_ms: 10000,
            walk_duration_secs: 5.0,
            stand_distance: 3.0,
            lateral_radius: 2.0,
            lateral_step_radians: std::f32::consts::PI / 6.5,
            hop_height: 0.1,
            hop_rate: 3.0,
            spawn_spread: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub camera_distance: f32,
    pub pan_offset: f32,
    pub approach_duration_secs: f32,
    pub turn_duration_secs: f32,
    pub settle_duration_secs: f32,
    /// Indexed by visitor id, starting at 1.
    pub personalities: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            timeout_secs: 30,
            camera_distance: 2.0,
            pan_offset: 0.8,
            approach_duration_secs: 1.0,
            turn_duration_secs: 0.5,
            settle_duration_secs: 1.0,
            personalities: default_personalities(),
        }
    }
}

fn default_personalities() -> Vec<String> {
    [
        "A late-night talk show host's humour. Talks simply and teases the user.",
        "Art gallery guide who loves to crack dad jokes every time. Very direct and simple.",
        "A spy on a secret mission. Wants to share about it, but only if pushed hard enough. Keeps mentioning evil hamsters.",
        "An arty person who wants to show off how arty they are.",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub position: [f32; 3],
    pub look_at: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            position: [-13.2, 1.6, 14.0],
            look_at: [0.0, 1.6, 0.0],
        }
    }
}

impl GalleryConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Defaults, then the file named by `GALLERY_CONFIG`, then single-value
    /// environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                log::info!("Loading config from {}", path.display());
                Self::load_from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(key) = non_empty(API_KEY_ENV) {
            self.chat.api_key = Some(key);
        }
        if let Some(model) = non_empty(CHAT_MODEL_ENV) {
            self.chat.model = model;
        }
        if let Some(endpoint) = non_empty(CHAT_ENDPOINT_ENV) {
            self.chat.endpoint = endpoint;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_gallery_constants() {
        let config = GalleryConfig::default();
        assert_eq!(config.interaction.max_pick_distance, 7.0);
        assert_eq!(config.visitors.countdown_min_ms, 3000);
        assert_eq!(config.visitors.countdown_max_ms, 10000);
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(config.chat.personalities.len(), 4);
        assert!(config.layout_path.is_none());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        std::fs::write(
            &path,
            r#"{ "interaction": { "max_pick_distance": 12.0 }, "chat": { "model": "local" } }"#,
        )
        .unwrap();

        let config = GalleryConfig::load_from_file(&path).unwrap();
        assert_eq!(config.interaction.max_pick_distance, 12.0);
        assert_eq!(config.interaction.focus_distance, 2.0);
        assert_eq!(config.chat.model, "local");
        assert_eq!(config.chat.pan_offset, 0.8);
        assert_eq!(config.visitors, VisitorConfig::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = GalleryConfig::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn environment_overrides_win_and_blanks_are_ignored() {
        let env: HashMap<&str, &str> = [
            (API_KEY_ENV, "sk-test"),
            (CHAT_MODEL_ENV, "  "),
            (CHAT_ENDPOINT_ENV, "http://localhost:8080/v1/chat/completions"),
        ]
        .into_iter()
        .collect();

        let mut config = GalleryConfig::default();
        config.apply_overrides(|key| env.get(key).map(|value| value.to_string()));
        assert_eq!(config.chat.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.chat.model, "gpt-4o-mini");
        assert_eq!(
            config.chat.endpoint,
            "http://localhost:8080/v1/chat/completions"
        );
    }
}
