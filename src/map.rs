use crate::command::{image_size, BlitCommand, TileRegion};
use crate::error::EditorError;
use crate::events::{EventRouter, GridEventKind, Subscription};
use crate::selector::{GridBoxSelector, GridDimensions};
use crate::tile_info::TileInfo;
use crate::tileset::Tileset;
use macroquad::prelude::*;
use serde::{Deserialize, Serialize};

/// Upper bound on `width * height` of the map image, 64 MiB of RGBA.
const MAX_MAP_PIXELS: u64 = 16 * 1024 * 1024;

/// Coarse map parameters edited through the Properties window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Display name, free text.
    pub map_name: String,
    /// Number of grid rows.
    pub rows: u32,
    /// Number of grid columns.
    pub columns: u32,
    /// Cell width in pixels, also the width of a painted source block.
    pub tile_width: u32,
    /// Cell height in pixels.
    pub tile_height: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            map_name: "Untitled".to_string(),
            rows: 3,
            columns: 3,
            tile_width: 20,
            tile_height: 20,
        }
    }
}

/// What gets painted: a tileset and a pixel offset into its image.
#[derive(Debug, Clone, Copy)]
pub struct Brush<'a> {
    /// Source tileset.
    pub tileset: &'a Tileset,
    /// Top-left pixel of the source block.
    pub offset: (u32, u32),
}

/// The tileset block a cell currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stamp {
    /// Tileset the block was copied from.
    pub tileset_name: String,
    /// Top-left pixel of the block in that tileset.
    pub offset: (u32, u32),
}

impl Stamp {
    fn of(brush: &Brush<'_>) -> Self {
        Stamp {
            tileset_name: brush.tileset.name.clone(),
            offset: brush.offset,
        }
    }

    fn of_record(tile: &TileInfo) -> Self {
        Stamp {
            tileset_name: tile.tileset_name.clone(),
            offset: (tile.tileset_x, tile.tileset_y),
        }
    }
}

/// What the map needs from whoever owns the tilesets.
pub trait TileSource {
    /// Currently selected tileset and source offset.
    fn brush(&self) -> Brush<'_>;
    /// Look a tileset up by name, for repainting tiles placed earlier.
    fn tileset(&self, name: &str) -> Option<&Tileset>;
}

/// Cells touched by one regeneration, as (row, column) pairs in grid order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegenerateReport {
    /// Cells that got a new `TileInfo`.
    pub created: Vec<(u32, u32)>,
    /// Cells that kept their `TileInfo`.
    pub retained: Vec<(u32, u32)>,
    /// Cells that fell outside the new bounds.
    pub discarded: Vec<(u32, u32)>,
}

/// The destination grid and the image it is painted into.
pub struct Map {
    config: MapConfig,
    dirty: bool,
    tiles: Vec<Vec<TileInfo>>,
    stamps: Vec<Vec<Stamp>>,
    restore_pending: bool,
    image: Image,
    texture: Option<Texture2D>,
    texture_stale: bool,
    selector: GridBoxSelector,
    clicks: Subscription,
}

impl Map {
    /// New map listening for clicks from its own selector on `channel`.
    /// Starts dirty so the first update builds the grid.
    pub fn new(config: MapConfig, router: &mut EventRouter, channel: &str) -> Self {
        Map {
            config,
            dirty: true,
            tiles: Vec::new(),
            stamps: Vec::new(),
            restore_pending: false,
            image: Image::empty(),
            texture: None,
            texture_stale: true,
            selector: GridBoxSelector::new(channel),
            clicks: router.subscribe(channel, GridEventKind::GridClicked),
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Whether the next update regenerates the grid.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force a regeneration on the next update.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Set the grid shape and tile size in one go.
    pub fn set_config(&mut self, rows: u32, columns: u32, tile_width: u32, tile_height: u32) {
        self.config.rows = rows;
        self.config.columns = columns;
        self.config.tile_width = tile_width;
        self.config.tile_height = tile_height;
        self.dirty = true;
    }

    /// Set the row count.
    pub fn set_rows(&mut self, rows: u32) {
        self.config.rows = rows;
        self.dirty = true;
    }

    /// Set the column count.
    pub fn set_columns(&mut self, columns: u32) {
        self.config.columns = columns;
        self.dirty = true;
    }

    /// Set the cell width in pixels.
    pub fn set_tile_width(&mut self, tile_width: u32) {
        self.config.tile_width = tile_width;
        self.dirty = true;
    }

    /// Set the cell height in pixels.
    pub fn set_tile_height(&mut self, tile_height: u32) {
        self.config.tile_height = tile_height;
        self.dirty = true;
    }

    /// Renaming never needs a rebuild.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.config.map_name = name.into();
    }

    /// Tile records, `tiles[row][column]`.
    pub fn tiles(&self) -> &[Vec<TileInfo>] {
        &self.tiles
    }

    /// Tile at column `x`, row `y`.
    pub fn tile(&self, x: u32, y: u32) -> Option<&TileInfo> {
        self.tiles.get(y as usize)?.get(x as usize)
    }

    /// What cell (`x` column, `y` row) currently shows.
    pub fn stamp(&self, x: u32, y: u32) -> Option<&Stamp> {
        self.stamps.get(y as usize)?.get(x as usize)
    }

    /// Tile records with their tileset fields set to what each cell shows.
    pub fn snapshot(&self) -> Vec<Vec<TileInfo>> {
        self.tiles
            .iter()
            .zip(&self.stamps)
            .map(|(tiles, stamps)| {
                tiles
                    .iter()
                    .zip(stamps)
                    .map(|(tile, stamp)| TileInfo {
                        tileset_name: stamp.tileset_name.clone(),
                        tileset_x: stamp.offset.0,
                        tileset_y: stamp.offset.1,
                        ..tile.clone()
                    })
                    .collect()
            })
            .collect()
    }

    /// The painted destination image.
    pub fn image(&self) -> &Image {
        &self.image
    }

    /// Selector over the map surface.
    pub fn selector(&self) -> &GridBoxSelector {
        &self.selector
    }

    /// Mutable selector, for feeding pointer input.
    pub fn selector_mut(&mut self) -> &mut GridBoxSelector {
        &mut self.selector
    }

    /// Replace configuration and tiles wholesale. The next update paints every
    /// cell from its own record instead of the current brush.
    pub(crate) fn replace_contents(&mut self, config: MapConfig, tiles: Vec<Vec<TileInfo>>) {
        self.stamps = tiles
            .iter()
            .map(|row| row.iter().map(Stamp::of_record).collect())
            .collect();
        self.config = config;
        self.tiles = tiles;
        self.restore_pending = true;
        self.dirty = true;
    }

    /// One frame: rebuild if dirty, then paint every cell clicked since the last frame.
    pub fn update(&mut self, source: &impl TileSource) -> Option<RegenerateReport> {
        let report = if self.dirty {
            match self.regenerate(source) {
                Ok(report) => Some(report),
                Err(e) => {
                    tracing::error!(error = %e, "map regeneration failed");
                    self.dirty = false;
                    None
                }
            }
        } else {
            None
        };

        for event in self.clicks.drain() {
            self.on_grid_clicked(event.x, event.y, source);
        }
        report
    }

    /// Resize the image and the grid to the current configuration.
    ///
    /// Cells inside both the old and the new bounds keep their `TileInfo` and
    /// are repainted in place with the source's current brush; new cells get a
    /// `TileInfo` built from that brush. Right after [`MapDocument::apply_to`]
    /// kept cells are painted from their own records instead.
    ///
    /// [`MapDocument::apply_to`]: crate::MapDocument::apply_to
    pub fn regenerate(&mut self, source: &impl TileSource) -> Result<RegenerateReport, EditorError> {
        let MapConfig {
            rows,
            columns,
            tile_width,
            tile_height,
            ..
        } = self.config;

        let (width, height) = match (
            columns.checked_mul(tile_width),
            rows.checked_mul(tile_height),
        ) {
            (Some(w), Some(h))
                if w <= u16::MAX as u32
                    && h <= u16::MAX as u32
                    && (w as u64) * (h as u64) <= MAX_MAP_PIXELS =>
            {
                (w, h)
            }
            _ => {
                return Err(EditorError::MapTooLarge {
                    width: columns.saturating_mul(tile_width),
                    height: rows.saturating_mul(tile_height),
                })
            }
        };

        self.image = Image::gen_image_color(width as u16, height as u16, BLANK);
        self.texture_stale = true;

        let restore = std::mem::take(&mut self.restore_pending);
        let brush = source.brush();
        let fresh = Stamp::of(&brush);
        let mut report = RegenerateReport::default();
        let mut old_rows = std::mem::take(&mut self.tiles).into_iter();
        let mut old_stamps = std::mem::take(&mut self.stamps).into_iter();
        let mut grid = Vec::with_capacity(rows as usize);
        let mut stamps = Vec::with_capacity(rows as usize);

        for row in 0..rows {
            let mut old_row = old_rows.next().unwrap_or_default().into_iter();
            let mut old_stamp_row = old_stamps.next().unwrap_or_default().into_iter();
            let mut new_row = Vec::with_capacity(columns as usize);
            let mut stamp_row = Vec::with_capacity(columns as usize);
            for col in 0..columns {
                let kept_stamp = old_stamp_row.next();
                let (tile, stamp) = match old_row.next() {
                    Some(tile) => {
                        report.retained.push((row, col));
                        let stamp = match kept_stamp {
                            Some(stamp) if restore => stamp,
                            _ => fresh.clone(),
                        };
                        (tile, stamp)
                    }
                    None => {
                        report.created.push((row, col));
                        let tile = TileInfo::new(
                            col,
                            row,
                            brush.tileset.name.clone(),
                            brush.offset.0,
                            brush.offset.1,
                        );
                        (tile, fresh.clone())
                    }
                };
                new_row.push(tile);
                stamp_row.push(stamp);
            }
            report
                .discarded
                .extend(old_row.map(|t| (t.grid_y, t.grid_x)));
            grid.push(new_row);
            stamps.push(stamp_row);
        }
        for rest in old_rows {
            report
                .discarded
                .extend(rest.into_iter().map(|t| (t.grid_y, t.grid_x)));
        }
        self.tiles = grid;
        self.stamps = stamps;

        for (row, stamp_row) in self.stamps.iter().enumerate() {
            for (col, stamp) in stamp_row.iter().enumerate() {
                let Some(tileset) = source.tileset(&stamp.tileset_name) else {
                    tracing::warn!(tileset = %stamp.tileset_name, x = col, y = row, "tileset not available, cell left blank");
                    continue;
                };
                if let Err(e) = Self::blit(
                    &mut self.image,
                    tile_width,
                    tile_height,
                    col as u32,
                    row as u32,
                    tileset,
                    stamp.offset,
                ) {
                    tracing::warn!(error = %e, "failed to repaint tile");
                }
            }
        }

        if let Err(e) = self.selector.set_dimensions(
            GridDimensions::TileSize {
                tile_width,
                tile_height,
            },
            Some((width, height)),
        ) {
            tracing::warn!(error = %e, "map selector left unconfigured");
        }

        self.dirty = false;
        tracing::info!(
            map = %self.config.map_name,
            rows,
            columns,
            created = report.created.len(),
            retained = report.retained.len(),
            discarded = report.discarded.len(),
            "map regenerated"
        );
        Ok(report)
    }

    /// Copy one tile-sized block from the brush into cell (`x` column, `y` row).
    /// Only the image changes; use [`Map::on_grid_clicked`] to also track the stamp.
    pub fn paint_tile(&mut self, x: u32, y: u32, brush: &Brush<'_>) -> Result<(), EditorError> {
        if y >= self.tiles.len() as u32
            || x >= self.tiles.get(y as usize).map_or(0, |r| r.len()) as u32
        {
            return Err(EditorError::CellOutOfBounds { x, y });
        }
        Self::blit(
            &mut self.image,
            self.config.tile_width,
            self.config.tile_height,
            x,
            y,
            brush.tileset,
            brush.offset,
        )?;
        self.texture_stale = true;
        Ok(())
    }

    fn blit(
        image: &mut Image,
        tile_width: u32,
        tile_height: u32,
        x: u32,
        y: u32,
        tileset: &Tileset,
        offset: (u32, u32),
    ) -> Result<(), EditorError> {
        let src = TileRegion::new(offset.0, offset.1, tile_width, tile_height);
        if !src.fits_in(&tileset.image) {
            let (image_width, image_height) = tileset.image_size();
            return Err(EditorError::SourceOutOfBounds {
                tileset: tileset.name.clone(),
                x: offset.0,
                y: offset.1,
                width: tile_width,
                height: tile_height,
                image_width,
                image_height,
            });
        }
        let dest = TileRegion::new(x * tile_width, y * tile_height, tile_width, tile_height);
        if !dest.fits_in(image) {
            return Err(EditorError::CellOutOfBounds { x, y });
        }
        BlitCommand {
            src,
            dest: (dest.start_x, dest.start_y),
        }
        .apply(&tileset.image, image);
        Ok(())
    }

    /// Paint a clicked cell with the current brush. The cell's `TileInfo` is
    /// left as it was created.
    pub fn on_grid_clicked(&mut self, x: u32, y: u32, source: &impl TileSource) {
        let brush = source.brush();
        match self.paint_tile(x, y, &brush) {
            Ok(()) => {
                if let Some(stamp) = self
                    .stamps
                    .get_mut(y as usize)
                    .and_then(|r| r.get_mut(x as usize))
                {
                    *stamp = Stamp::of(&brush);
                }
                tracing::debug!(x, y, offset = ?brush.offset, "painted tile");
            }
            Err(e) => tracing::warn!(error = %e, "ignoring grid click"),
        }
    }

    /// Screen rectangle the map occupies when drawn at `origin` with `zoom`.
    pub fn surface(&self, origin: Vec2, zoom: f32) -> Rect {
        let (w, h) = image_size(&self.image);
        Rect::new(origin.x, origin.y, w as f32 * zoom, h as f32 * zoom)
    }

    /// Upload the image if it changed and draw it stretched over `surface`.
    pub fn draw(&mut self, surface: Rect) {
        if self.texture_stale {
            let same_size = self.texture.as_ref().is_some_and(|t| {
                t.width() as usize == self.image.width() && t.height() as usize == self.image.height()
            });
            match &self.texture {
                Some(tex) if same_size => tex.update(&self.image),
                _ => {
                    let tex = Texture2D::from_image(&self.image);
                    tex.set_filter(FilterMode::Nearest);
                    self.texture = Some(tex);
                }
            }
            self.texture_stale = false;
        }

        if let Some(tex) = &self.texture {
            draw_rectangle(surface.x, surface.y, surface.w, surface.h, DARKGRAY);
            draw_texture_ex(
                tex,
                surface.x,
                surface.y,
                WHITE,
                DrawTextureParams {
                    dest_size: Some(surface.size()),
                    ..Default::default()
                },
            );
        }
        self.selector.draw_overlay(surface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{pixel, put_pixel};

    /// Every pixel encodes its own coordinates so blits can be traced back.
    fn coded_tileset(name: &str, w: u16, h: u16, tile: u32) -> Tileset {
        let mut img = Image::gen_image_color(w, h, BLANK);
        for y in 0..h as u32 {
            for x in 0..w as u32 {
                put_pixel(&mut img, x, y, [x as u8, y as u8, 7, 255]);
            }
        }
        Tileset::from_image(name, img, tile, tile).unwrap()
    }

    struct Palette {
        tileset: Tileset,
        offset: (u32, u32),
    }

    impl TileSource for Palette {
        fn brush(&self) -> Brush<'_> {
            Brush {
                tileset: &self.tileset,
                offset: self.offset,
            }
        }
        fn tileset(&self, name: &str) -> Option<&Tileset> {
            (self.tileset.name == name).then_some(&self.tileset)
        }
    }

    fn palette() -> Palette {
        Palette {
            tileset: coded_tileset("coded", 80, 40, 20),
            offset: (0, 0),
        }
    }

    fn map_with(rows: u32, columns: u32, router: &mut EventRouter) -> Map {
        Map::new(
            MapConfig {
                rows,
                columns,
                ..MapConfig::default()
            },
            router,
            "Map",
        )
    }

    fn shape(map: &Map) -> (usize, Vec<usize>) {
        (map.tiles().len(), map.tiles().iter().map(|r| r.len()).collect())
    }

    #[test]
    fn regenerate_matches_configured_shape() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(2, 3, &mut router);
        for (rows, cols) in [(2, 3), (1, 1), (4, 2), (3, 3)] {
            map.set_config(rows, cols, 20, 20);
            map.regenerate(&src).unwrap();
            assert_eq!(shape(&map), (rows as usize, vec![cols as usize; rows as usize]));
            assert_eq!(image_size(map.image()), (cols * 20, rows * 20));
            assert!(!map.is_dirty());
        }
    }

    #[test]
    fn grow_two_by_two_to_three_by_three() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(2, 2, &mut router);
        assert_eq!(map.update(&src).unwrap().created.len(), 4);

        map.set_config(3, 3, 20, 20);
        let report = map.regenerate(&src).unwrap();
        assert_eq!(report.created, vec![(0, 2), (1, 2), (2, 0), (2, 1), (2, 2)]);
        assert_eq!(report.retained, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
        assert!(report.discarded.is_empty());
    }

    #[test]
    fn shrink_then_grow_never_resurrects_tiles() {
        let mut router = EventRouter::new();
        let mut src = palette();
        let mut map = map_with(2, 2, &mut router);
        map.update(&src);

        src.offset = (20, 0);
        map.set_config(1, 2, 20, 20);
        let report = map.regenerate(&src).unwrap();
        assert_eq!(report.discarded, vec![(1, 0), (1, 1)]);

        src.offset = (40, 20);
        map.set_config(3, 3, 20, 20);
        map.regenerate(&src).unwrap();

        // survived every step: original brush
        assert_eq!(map.tile(0, 0).unwrap().tileset_x, 0);
        assert_eq!(map.tile(1, 0).unwrap().tileset_x, 0);
        // dropped by the shrink: recreated with the latest brush
        assert_eq!(map.tile(0, 1).unwrap().tileset_x, 40);
        assert_eq!(map.tile(1, 1).unwrap().tileset_y, 20);
        assert_eq!((map.tile(2, 1).unwrap().grid_x, map.tile(2, 1).unwrap().grid_y), (2, 1));
    }

    #[test]
    fn paint_tile_copies_source_block_to_cell_origin() {
        let mut router = EventRouter::new();
        let mut src = palette();
        let mut map = map_with(3, 3, &mut router);
        map.update(&src);

        src.offset = (40, 20);
        map.paint_tile(1, 2, &src.brush()).unwrap();

        assert_eq!(pixel(map.image(), 20, 40), [40, 20, 7, 255]);
        assert_eq!(pixel(map.image(), 39, 59), [59, 39, 7, 255]);
        // neighbouring cell still shows the original (0, 0) block
        assert_eq!(pixel(map.image(), 40, 40), [0, 0, 7, 255]);
    }

    #[test]
    fn retained_tiles_are_repainted_with_current_brush() {
        let mut router = EventRouter::new();
        let mut src = palette();
        src.offset = (60, 20);
        let mut map = map_with(1, 1, &mut router);
        map.update(&src);
        assert_eq!(pixel(map.image(), 0, 0), [60, 20, 7, 255]);

        src.offset = (20, 0);
        map.set_config(1, 2, 20, 20);
        map.regenerate(&src).unwrap();
        assert_eq!(pixel(map.image(), 0, 0), [20, 0, 7, 255]);
        assert_eq!(pixel(map.image(), 20, 0), [20, 0, 7, 255]);
        // the record keeps the brush it was created with
        let tile = map.tile(0, 0).unwrap();
        assert_eq!((tile.tileset_x, tile.tileset_y), (60, 20));
        assert_eq!(map.stamp(0, 0).unwrap().offset, (20, 0));
    }

    #[test]
    fn replaced_contents_paint_from_records_once() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(1, 2, &mut router);
        map.replace_contents(
            MapConfig {
                rows: 1,
                columns: 2,
                ..MapConfig::default()
            },
            vec![vec![
                TileInfo::new(0, 0, "coded", 40, 20),
                TileInfo::new(1, 0, "coded", 60, 0),
            ]],
        );
        let report = map.update(&src).unwrap();
        assert_eq!(report.retained.len(), 2);
        assert_eq!(pixel(map.image(), 0, 0), [40, 20, 7, 255]);
        assert_eq!(pixel(map.image(), 20, 0), [60, 0, 7, 255]);

        // later resizes go back to the brush
        map.set_config(1, 3, 20, 20);
        map.regenerate(&src).unwrap();
        assert_eq!(pixel(map.image(), 0, 0), [0, 0, 7, 255]);
    }

    #[test]
    fn source_outside_tileset_is_rejected() {
        let mut router = EventRouter::new();
        let mut src = palette();
        let mut map = map_with(1, 1, &mut router);
        map.update(&src);
        src.offset = (70, 0);
        let err = map.paint_tile(0, 0, &src.brush()).unwrap_err();
        assert!(matches!(err, EditorError::SourceOutOfBounds { x: 70, .. }));
    }

    #[test]
    fn click_paints_without_touching_record() {
        let mut router = EventRouter::new();
        let mut src = palette();
        let mut map = map_with(2, 2, &mut router);
        map.update(&src);
        let before = map.tile(1, 0).unwrap().clone();

        src.offset = (20, 20);
        map.selector_mut()
            .handle_pointer(Rect::new(0.0, 0.0, 40.0, 40.0), vec2(30.0, 5.0), true, &mut router);
        map.update(&src);

        assert_eq!(map.tile(1, 0), Some(&before));
        assert_eq!(map.stamp(1, 0).unwrap().offset, (20, 20));
        assert_eq!(pixel(map.image(), 20, 0), [20, 20, 7, 255]);
        assert_eq!(map.snapshot()[0][1].tileset_x, 20);
    }

    #[test]
    fn out_of_bounds_click_is_ignored() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(2, 2, &mut router);
        map.update(&src);
        let before = map.image().bytes.clone();

        map.on_grid_clicked(5, 0, &src);
        assert_eq!(map.image().bytes, before);
        assert_eq!(shape(&map), (2, vec![2, 2]));
    }

    #[test]
    fn oversized_map_keeps_previous_grid() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(2, 2, &mut router);
        map.update(&src);

        map.set_columns(5000);
        assert!(map.update(&src).is_none());
        assert!(!map.is_dirty());
        assert_eq!(shape(&map), (2, vec![2, 2]));
    }

    #[test]
    fn huge_pixel_count_is_refused() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(2, 2, &mut router);
        map.update(&src);

        // 60000 x 60000 fits u16 per axis but not in memory
        map.set_config(3000, 3000, 20, 20);
        assert!(matches!(
            map.regenerate(&src),
            Err(EditorError::MapTooLarge {
                width: 60000,
                height: 60000
            })
        ));
        assert_eq!(shape(&map), (2, vec![2, 2]));
    }

    #[test]
    fn map_selector_tracks_grid_size() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(2, 3, &mut router);
        map.update(&src);
        let size = map.selector().size().unwrap();
        assert_eq!((size.rows, size.columns), (2, 3));
    }

    #[test]
    fn rename_does_not_dirty() {
        let mut router = EventRouter::new();
        let src = palette();
        let mut map = map_with(1, 1, &mut router);
        map.update(&src);
        map.set_name("Dungeon");
        assert!(!map.is_dirty());
        assert_eq!(map.config().map_name, "Dungeon");
    }
}
