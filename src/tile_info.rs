use serde::{Deserialize, Serialize};

/// One placed tile: where it sits on the map and which tileset block it shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileInfo {
    /// Column on the map grid
    pub grid_x: u32,
    /// Row on the map grid
    pub grid_y: u32,
    /// Tileset the block was taken from
    pub tileset_name: String,
    /// Pixel offset of the source block inside the tileset image
    pub tileset_x: u32,
    /// See `tileset_x`
    pub tileset_y: u32,
    /// Whether the tile can be walked on
    #[serde(default = "default_true")]
    pub passable: bool,
    /// Draw depth
    #[serde(default = "one")]
    pub depth: i32,
}

fn default_true() -> bool {
    true
}
fn one() -> i32 {
    1
}

impl TileInfo {
    /// Passable tile at depth 1.
    pub fn new(
        grid_x: u32,
        grid_y: u32,
        tileset_name: impl Into<String>,
        tileset_x: u32,
        tileset_y: u32,
    ) -> Self {
        TileInfo {
            grid_x,
            grid_y,
            tileset_name: tileset_name.into(),
            tileset_x,
            tileset_y,
            passable: true,
            depth: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_tile_is_passable_at_depth_one() {
        let tile = TileInfo::new(2, 1, "grass", 40, 20);
        assert_eq!((tile.grid_x, tile.grid_y), (2, 1));
        assert_eq!(tile.tileset_name, "grass");
        assert!(tile.passable);
        assert_eq!(tile.depth, 1);
    }

    #[test]
    fn missing_passable_and_depth_use_defaults() {
        let json = r#"{"grid_x":0,"grid_y":3,"tileset_name":"t","tileset_x":0,"tileset_y":16}"#;
        let tile: TileInfo = serde_json::from_str(json).expect("parse tile");
        assert!(tile.passable);
        assert_eq!(tile.depth, 1);
        assert_eq!(tile.tileset_y, 16);
    }
}
