use crate::command::{image_size, put_pixel};
use crate::error::EditorError;
use macroquad::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// On-disk tileset definition, Tiled external tileset layout.
#[derive(Deserialize)]
struct TilesetDef {
    tilewidth: u32,
    tileheight: u32,
    #[serde(default)]
    tilecount: u32,
    #[serde(default)]
    columns: u32,
    image: String,
    #[serde(default)]
    spacing: u32,
    #[serde(default)]
    margin: u32,
}

/// A source image cut into a regular grid of tiles.
///
/// Tiles are packed edge to edge from the top-left corner.
pub struct Tileset {
    /// Catalog name, the definition's file stem.
    pub name: String,
    /// Source pixels.
    pub image: Image,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Tile rows in the image.
    pub rows: u32,
    /// Tile columns in the image.
    pub columns: u32,
}

impl fmt::Debug for Tileset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tileset")
            .field("name", &self.name)
            .field("image_size", &image_size(&self.image))
            .field("tile_width", &self.tile_width)
            .field("tile_height", &self.tile_height)
            .field("rows", &self.rows)
            .field("columns", &self.columns)
            .finish()
    }
}

impl Tileset {
    /// Build a tileset whose grid is derived from the image size.
    pub fn from_image(
        name: impl Into<String>,
        image: Image,
        tile_width: u32,
        tile_height: u32,
    ) -> Result<Self, EditorError> {
        if tile_width == 0 || tile_height == 0 {
            return Err(EditorError::InvalidDimensions(format!(
                "tile size {tile_width}x{tile_height}"
            )));
        }
        let (w, h) = image_size(&image);
        Ok(Tileset {
            name: name.into(),
            rows: h / tile_height,
            columns: w / tile_width,
            image,
            tile_width,
            tile_height,
        })
    }

    /// Load a definition file and the image it points at (relative to the definition).
    pub fn load(name: &str, def_path: &Path) -> Result<Self, EditorError> {
        let txt = std::fs::read_to_string(def_path).map_err(|source| EditorError::Io {
            path: def_path.to_path_buf(),
            source,
        })?;
        let def: TilesetDef = serde_json::from_str(&txt).map_err(|source| EditorError::Json {
            path: def_path.to_path_buf(),
            source,
        })?;
        if def.spacing != 0 || def.margin != 0 {
            return Err(EditorError::InvalidDimensions(format!(
                "tileset '{name}' uses spacing {} and margin {}; only packed tilesets are supported",
                def.spacing, def.margin
            )));
        }

        let base = def_path.parent().unwrap_or_else(|| Path::new("./"));
        let img_path = base.join(&def.image);
        let bytes = std::fs::read(&img_path).map_err(|source| EditorError::Io {
            path: img_path.clone(),
            source,
        })?;
        let image =
            Image::from_file_with_format(&bytes, None).map_err(|e| EditorError::Image {
                path: img_path.clone(),
                message: e.to_string(),
            })?;

        let mut tileset = Self::from_image(name, image, def.tilewidth, def.tileheight)?;
        if def.columns > 0 {
            tileset.columns = def.columns;
            if def.tilecount > 0 {
                tileset.rows = def.tilecount.div_ceil(def.columns);
            }
        }

        tracing::info!(
            tileset = name,
            image = %img_path.display(),
            rows = tileset.rows,
            columns = tileset.columns,
            "loaded tileset"
        );
        Ok(tileset)
    }

    /// Image width and height in pixels.
    pub fn image_size(&self) -> (u32, u32) {
        image_size(&self.image)
    }

    /// Overlay image with opaque black pixels on tile boundaries and
    /// transparent pixels everywhere else.
    pub fn grid_lines(&self) -> Image {
        let (w, h) = self.image_size();
        let mut lines = Image::gen_image_color(w as u16, h as u16, BLANK);
        for y in 0..h {
            for x in 0..w {
                if x % self.tile_width == 0 || y % self.tile_height == 0 {
                    put_pixel(&mut lines, x, y, [0, 0, 0, 255]);
                }
            }
        }
        lines
    }
}

/// Tileset definitions found under a resource directory, by name.
#[derive(Debug, Clone)]
pub struct TilesetCatalog {
    root: PathBuf,
    names: Vec<String>,
    paths: HashMap<String, PathBuf>,
}

impl TilesetCatalog {
    /// Recursively collect `*.json` definitions under `root`. Metadata files
    /// are skipped and the first file wins when two share a stem.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self, EditorError> {
        let root = root.as_ref();
        std::fs::metadata(root).map_err(|source| EditorError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let mut names = Vec::new();
        let mut paths = HashMap::new();
        for entry in walkdir::WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let file_path = entry.path();
            if file_path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let name = match file_path.file_stem().and_then(|s| s.to_str()) {
                Some(n) if !n.is_empty() => n.to_string(),
                _ => continue,
            };
            if paths.contains_key(&name) {
                tracing::warn!(tileset = %name, path = %file_path.display(), "duplicate tileset name; skipping");
                continue;
            }
            paths.insert(name.clone(), file_path.to_path_buf());
            names.push(name);
        }

        if names.is_empty() {
            return Err(EditorError::NoTilesets(root.to_path_buf()));
        }
        names.sort();
        tracing::debug!(root = %root.display(), count = names.len(), "discovered tilesets");

        Ok(TilesetCatalog {
            root: root.to_path_buf(),
            names,
            paths,
        })
    }

    /// Directory the catalog was discovered from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Sorted tileset names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Whether a definition named `name` was found.
    pub fn contains(&self, name: &str) -> bool {
        self.paths.contains_key(name)
    }

    /// The configured default when it exists, else the first discovered name.
    pub fn default_name<'a>(&'a self, configured: Option<&'a str>) -> &'a str {
        match configured {
            Some(name) if self.contains(name) => name,
            Some(name) => {
                tracing::warn!(tileset = name, "configured default tileset not found");
                &self.names[0]
            }
            None => &self.names[0],
        }
    }

    /// Load the definition and image of `name`.
    pub fn load(&self, name: &str) -> Result<Tileset, EditorError> {
        let path = self
            .paths
            .get(name)
            .ok_or_else(|| EditorError::UnknownTileset(name.to_owned()))?;
        Tileset::load(name, path)
    }
}
