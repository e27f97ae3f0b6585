use std::io;
use std::path::PathBuf;

/// Error type for the map editor.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// File I/O error
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },
    /// JSON parse or serialize error
    #[error("JSON error in {path}: {source}")]
    Json {
        /// File being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
    /// Tileset image could not be decoded
    #[error("Failed to decode image {path}: {message}")]
    Image {
        /// Image file
        path: PathBuf,
        /// Decoder message
        message: String,
    },
    /// A tileset name is not in the catalog
    #[error("Unknown tileset: {0}")]
    UnknownTileset(String),
    /// The resource directory holds no tileset definitions
    #[error("No tilesets found under {0}")]
    NoTilesets(PathBuf),
    /// Rows, columns or tile sizes that cannot address a grid
    #[error("Invalid grid dimensions: {0}")]
    InvalidDimensions(String),
    /// Map image exceeds the 16-bit per-axis limit or the total pixel cap
    #[error("Map of {width}x{height} pixels exceeds the maximum image size")]
    MapTooLarge {
        /// Requested width in pixels
        width: u32,
        /// Requested height in pixels
        height: u32,
    },
    /// Source block lies (partly) outside the tileset image
    #[error(
        "Source block {width}x{height} at ({x}, {y}) lies outside tileset '{tileset}' ({image_width}x{image_height})"
    )]
    #[allow(missing_docs)]
    SourceOutOfBounds {
        tileset: String,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        image_width: u32,
        image_height: u32,
    },
    /// Cell address outside the current map grid
    #[error("Cell ({x}, {y}) is outside the map grid")]
    CellOutOfBounds {
        /// Column
        x: u32,
        /// Row
        y: u32,
    },
}
