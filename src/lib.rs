#![warn(missing_docs)]
//! Grid-based tile map editor for Macroquad.
//!
//! A [`Map`] owns the destination grid of [`TileInfo`] records and the image
//! they are painted into. A [`MapEditor`] holds the editable map properties,
//! the tileset catalog and the palette selection. The two talk through an
//! [`EventRouter`]: each [`GridBoxSelector`] publishes confirmed clicks on its
//! own channel.

mod app;
mod command;
mod config;
mod document;
mod editor;
mod error;
mod events;
mod map;
mod selector;
mod tile_info;
mod tileset;

pub use app::EditorApp;
pub use command::{image_size, pixel, put_pixel, BlitCommand, TileRegion};
pub use config::EditorConfig;
pub use document::MapDocument;
pub use editor::{ConfigField, EditorWindow, FieldId, MapEditor, WindowId};
pub use error::EditorError;
pub use events::{EventRouter, GridEvent, GridEventKind, Subscription};
pub use map::{Brush, Map, MapConfig, RegenerateReport, Stamp, TileSource};
pub use selector::{GridBoxSelector, GridDimensions, GridSize};
pub use tile_info::TileInfo;
pub use tileset::{Tileset, TilesetCatalog};
