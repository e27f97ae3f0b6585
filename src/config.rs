use crate::error::EditorError;
use crate::map::MapConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Startup settings, read from an optional JSON file. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Directory searched for tileset definitions
    pub resource_dir: PathBuf,
    /// Tileset selected at startup; the first discovered one when unset
    pub default_tileset: Option<String>,
    /// Starting map configuration
    pub map: MapConfig,
    /// Channel the map's selector publishes clicks on
    pub map_channel: String,
    /// Channel the palette's selector publishes clicks on
    pub palette_channel: String,
    /// Initial window width
    pub window_width: i32,
    /// Initial window height
    pub window_height: i32,
    /// Screen pixels per map pixel
    pub map_zoom: f32,
    /// Where `save` writes the map document
    pub document_path: PathBuf,
}

impl Default for EditorConfig {
    fn default() -> Self {
        EditorConfig {
            resource_dir: PathBuf::from("assets/tilesets"),
            default_tileset: None,
            map: MapConfig::default(),
            map_channel: "Map".to_string(),
            palette_channel: "Palette".to_string(),
            window_width: 1280,
            window_height: 720,
            map_zoom: 2.0,
            document_path: PathBuf::from("map.json"),
        }
    }
}

impl EditorConfig {
    /// Read a config file. Relative paths inside it are resolved against its directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path).map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: EditorConfig =
            serde_json::from_str(&txt).map_err(|source| EditorError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        // relative paths are relative to the config file
        if let Some(base) = path.parent() {
            if config.resource_dir.is_relative() {
                config.resource_dir = base.join(&config.resource_dir);
            }
            if config.document_path.is_relative() {
                config.document_path = base.join(&config.document_path);
            }
        }
        Ok(config)
    }

    /// `path` when given, otherwise the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EditorError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }
}
