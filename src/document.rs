//! JSON save/load of a map's configuration and tile records.

use crate::error::EditorError;
use crate::map::{Map, MapConfig};
use crate::tile_info::TileInfo;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A saved map: its configuration and one tile record per cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapDocument {
    /// Map configuration, flattened into the top-level object.
    #[serde(flatten)]
    pub config: MapConfig,
    /// Row-major, `tiles[row][column]`
    pub tiles: Vec<Vec<TileInfo>>,
}

impl MapDocument {
    /// Capture `map` as it is displayed: each record names the block its cell shows.
    pub fn from_map(map: &Map) -> Self {
        MapDocument {
            config: map.config().clone(),
            tiles: map.snapshot(),
        }
    }

    /// Distinct tileset names the tiles refer to, in first-use order.
    pub fn tileset_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for tile in self.tiles.iter().flatten() {
            if !names.contains(&tile.tileset_name.as_str()) {
                names.push(&tile.tileset_name);
            }
        }
        names
    }

    /// Every tile must sit where its coordinates say, inside the configured bounds.
    pub fn validate(&self) -> Result<(), EditorError> {
        if self.tiles.len() > self.config.rows as usize {
            return Err(EditorError::InvalidDimensions(format!(
                "{} tile rows for {} map rows",
                self.tiles.len(),
                self.config.rows
            )));
        }
        for (row, cells) in self.tiles.iter().enumerate() {
            if cells.len() > self.config.columns as usize {
                return Err(EditorError::InvalidDimensions(format!(
                    "row {row} holds {} tiles for {} columns",
                    cells.len(),
                    self.config.columns
                )));
            }
            for (col, tile) in cells.iter().enumerate() {
                if tile.grid_x as usize != col || tile.grid_y as usize != row {
                    return Err(EditorError::InvalidDimensions(format!(
                        "tile at row {row}, column {col} claims ({}, {})",
                        tile.grid_x, tile.grid_y
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the document as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EditorError> {
        let path = path.as_ref();
        let txt = serde_json::to_string_pretty(self).map_err(|source| EditorError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, txt).map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), map = %self.config.map_name, "map saved");
        Ok(())
    }

    /// Read and validate a document.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EditorError> {
        let path = path.as_ref();
        let txt = std::fs::read_to_string(path).map_err(|source| EditorError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc: MapDocument = serde_json::from_str(&txt).map_err(|source| EditorError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        doc.validate()?;
        Ok(doc)
    }

    /// Hand configuration and tiles to `map`; its next update paints every
    /// cell from its record.
    pub fn apply_to(self, map: &mut Map) {
        map.replace_contents(self.config, self.tiles);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventRouter;
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_file(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock went backwards")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("mq_tile_editor_doc_{nanos}"));
        fs::create_dir_all(&dir).expect("failed to create temp dir");
        dir.join(name)
    }

    fn doc() -> MapDocument {
        MapDocument {
            config: MapConfig {
                map_name: "Cave".into(),
                rows: 1,
                columns: 2,
                tile_width: 16,
                tile_height: 16,
            },
            tiles: vec![vec![
                TileInfo::new(0, 0, "rock", 0, 0),
                TileInfo::new(1, 0, "rock", 16, 0),
            ]],
        }
    }

    #[test]
    fn saved_document_loads_back() {
        let path = temp_file("cave.json");
        doc().save(&path).expect("save");
        let txt = fs::read_to_string(&path).unwrap();
        assert!(txt.contains("\"map_name\": \"Cave\""));
        assert_eq!(MapDocument::load(&path).expect("load"), doc());
    }

    #[test]
    fn misplaced_tile_is_rejected() {
        let mut d = doc();
        d.tiles[0][1].grid_x = 5;
        assert!(matches!(d.validate(), Err(EditorError::InvalidDimensions(_))));
    }

    #[test]
    fn too_many_rows_is_rejected() {
        let mut d = doc();
        d.tiles.push(vec![TileInfo::new(0, 1, "rock", 0, 0)]);
        assert!(d.validate().is_err());
    }

    #[test]
    fn tileset_names_are_distinct() {
        let mut d = doc();
        d.tiles[0][1].tileset_name = "moss".into();
        d.tiles[0].push(TileInfo::new(2, 0, "rock", 0, 0));
        assert_eq!(d.tileset_names(), ["rock", "moss"]);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = MapDocument::load("nope/never.json").unwrap_err();
        assert!(matches!(err, EditorError::Io { .. }));
    }

    #[test]
    fn apply_marks_map_for_rebuild() {
        let mut router = EventRouter::new();
        let mut map = Map::new(MapConfig::default(), &mut router, "Map");
        doc().apply_to(&mut map);
        assert!(map.is_dirty());
        assert_eq!(map.config().map_name, "Cave");
        assert_eq!(map.tile(1, 0).unwrap().tileset_x, 16);
        assert_eq!(MapDocument::from_map(&map), doc());
    }
}
