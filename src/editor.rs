use crate::error::EditorError;
use crate::events::{EventRouter, GridEventKind, Subscription};
use crate::map::{Brush, Map, MapConfig, TileSource};
use crate::selector::{GridBoxSelector, GridDimensions};
use crate::tileset::{Tileset, TilesetCatalog};
use macroquad::prelude::*;
use macroquad::ui::{hash, root_ui, widgets, Ui};
use std::collections::HashMap;

/// Which map property a [`ConfigField`] edits.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldId {
    Name,
    Rows,
    Columns,
    TileWidth,
    TileHeight,
}

/// One editable text field of the Properties window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigField {
    /// Property this field edits.
    pub id: FieldId,
    /// Label shown next to the input.
    pub label: &'static str,
    /// Text as currently typed.
    pub input: String,
    /// Text as of the last applied edit.
    pub previous: String,
}

impl ConfigField {
    fn new(id: FieldId, label: &'static str, value: String) -> Self {
        ConfigField {
            id,
            label,
            previous: value.clone(),
            input: value,
        }
    }
}

/// Index into the editor's window list; ui state is keyed on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub usize);

impl WindowId {
    /// Map name, size and tile size fields.
    pub const PROPERTIES: WindowId = WindowId(0);
    /// Tileset list and preview toggle.
    pub const PALETTE: WindowId = WindowId(1);
}

/// A toggleable editor window.
#[derive(Debug, Clone)]
pub struct EditorWindow {
    /// Title bar and toggle button text.
    pub title: String,
    /// Initial screen placement.
    pub rect: Rect,
    /// Drawn this frame or not.
    pub visible: bool,
}

enum GuiAction {
    ToggleWindow(WindowId),
    SelectTileset(String),
}

/// Map configuration fields, tileset selection and the editor windows.
pub struct MapEditor {
    fields: Vec<ConfigField>,
    catalog: TilesetCatalog,
    tileset: Tileset,
    cache: HashMap<String, Tileset>,
    palette_selector: GridBoxSelector,
    palette_clicks: Subscription,
    grid_lines: Image,
    preview: Option<(Texture2D, Texture2D)>,
    show_preview: bool,
    windows: Vec<EditorWindow>,
}

impl MapEditor {
    /// Builds the editor around `catalog`, loading `default_tileset` or the
    /// first discovered one.
    pub fn new(
        catalog: TilesetCatalog,
        default_tileset: Option<&str>,
        map_config: &MapConfig,
        router: &mut EventRouter,
        palette_channel: &str,
    ) -> Result<Self, EditorError> {
        let name = catalog.default_name(default_tileset).to_owned();
        let tileset = catalog.load(&name)?;
        Self::with_tileset(catalog, tileset, map_config, router, palette_channel)
    }

    /// Same as [`MapEditor::new`] but with an already loaded starting tileset.
    pub fn with_tileset(
        catalog: TilesetCatalog,
        tileset: Tileset,
        map_config: &MapConfig,
        router: &mut EventRouter,
        palette_channel: &str,
    ) -> Result<Self, EditorError> {
        let fields = vec![
            ConfigField::new(FieldId::Name, "Name:", map_config.map_name.clone()),
            ConfigField::new(FieldId::Rows, "Rows:", map_config.rows.to_string()),
            ConfigField::new(FieldId::Columns, "Columns:", map_config.columns.to_string()),
            ConfigField::new(FieldId::TileWidth, "Tile Width:", map_config.tile_width.to_string()),
            ConfigField::new(FieldId::TileHeight, "Tile Height:", map_config.tile_height.to_string()),
        ];
        let windows = vec![
            EditorWindow {
                title: "Properties".into(),
                rect: Rect::new(10.0, 40.0, 180.0, 260.0),
                visible: false,
            },
            EditorWindow {
                title: "Palette".into(),
                rect: Rect::new(200.0, 40.0, 200.0, 260.0),
                visible: false,
            },
        ];

        let mut editor = MapEditor {
            fields,
            catalog,
            grid_lines: Image::empty(),
            tileset: Tileset::from_image("", Image::empty(), 1, 1)?,
            cache: HashMap::new(),
            palette_selector: GridBoxSelector::new(palette_channel),
            palette_clicks: router.subscribe(palette_channel, GridEventKind::GridClicked),
            preview: None,
            show_preview: true,
            windows,
        };
        editor.install_tileset(tileset)?;
        Ok(editor)
    }

    /// The Properties window fields, in display order.
    pub fn fields(&self) -> &[ConfigField] {
        &self.fields
    }

    /// Mutable fields, as the text inputs write them.
    pub fn fields_mut(&mut self) -> &mut [ConfigField] {
        &mut self.fields
    }

    /// Tilesets available for selection.
    pub fn catalog(&self) -> &TilesetCatalog {
        &self.catalog
    }

    /// The tileset the palette shows.
    pub fn selected_tileset(&self) -> &Tileset {
        &self.tileset
    }

    /// Selector over the tileset preview.
    pub fn palette_selector(&self) -> &GridBoxSelector {
        &self.palette_selector
    }

    /// Mutable palette selector, for feeding pointer input.
    pub fn palette_selector_mut(&mut self) -> &mut GridBoxSelector {
        &mut self.palette_selector
    }

    /// Grid-line overlay for the selected tileset.
    pub fn grid_lines(&self) -> &Image {
        &self.grid_lines
    }

    /// Whether the tileset preview is drawn.
    pub fn show_preview(&self) -> bool {
        self.show_preview
    }

    /// Show or hide the tileset preview.
    pub fn set_show_preview(&mut self, show: bool) {
        self.show_preview = show;
    }

    /// Whether `name` is loaded, either selected or kept from an earlier switch.
    pub fn has_loaded(&self, name: &str) -> bool {
        self.tileset.name == name || self.cache.contains_key(name)
    }

    /// Pixel offset into the selected tileset.
    ///
    /// The axes are crossed: x comes from the selected row and y from the
    /// selected column.
    pub fn selected_offset(&self) -> (u32, u32) {
        let (sel_x, sel_y) = self.palette_selector.selected();
        (
            self.tileset.tile_height * sel_y,
            self.tileset.tile_width * sel_x,
        )
    }

    /// Push every field whose text changed since last frame into `map`.
    /// Integer fields that do not parse become 0.
    pub fn apply_field_edits(&mut self, map: &mut Map) -> bool {
        let mut changed = false;
        for field in self.fields.iter_mut().filter(|f| f.input != f.previous) {
            field.previous = field.input.clone();
            changed = true;
            match field.id {
                FieldId::Name => map.set_name(field.input.clone()),
                FieldId::Rows => map.set_rows(parse_or_zero(&field.input)),
                FieldId::Columns => map.set_columns(parse_or_zero(&field.input)),
                FieldId::TileWidth => map.set_tile_width(parse_or_zero(&field.input)),
                FieldId::TileHeight => map.set_tile_height(parse_or_zero(&field.input)),
            }
            tracing::debug!(field = ?field.id, value = %field.input, "map property edited");
        }
        changed
    }

    /// Switch to tileset `name`, resetting the palette selection to (0, 0).
    pub fn load_tileset(&mut self, name: &str) -> Result<(), EditorError> {
        if name == self.tileset.name {
            self.palette_selector.reset_selection();
            return Ok(());
        }
        let tileset = match self.cache.remove(name) {
            Some(ts) => ts,
            None => self.catalog.load(name)?,
        };
        self.install_tileset(tileset)
    }

    /// Load every named tileset that is not loaded yet, so tiles placed with
    /// it can be repainted. Returns the names the catalog could not provide.
    pub fn preload_tilesets<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for name in names {
            if self.has_loaded(name) || missing.iter().any(|m| m == name) {
                continue;
            }
            match self.catalog.load(name) {
                Ok(tileset) => {
                    tracing::debug!(tileset = name, "preloaded tileset");
                    self.cache.insert(name.to_owned(), tileset);
                }
                Err(e) => {
                    tracing::warn!(error = %e, tileset = name, "referenced tileset not loaded");
                    missing.push(name.to_owned());
                }
            }
        }
        missing
    }

    fn install_tileset(&mut self, tileset: Tileset) -> Result<(), EditorError> {
        if tileset.rows == 0 || tileset.columns == 0 {
            return Err(EditorError::InvalidDimensions(format!(
                "tileset '{}' is smaller than one tile",
                tileset.name
            )));
        }

        self.palette_selector.set_dimensions(
            GridDimensions::TileSize {
                tile_width: tileset.tile_width,
                tile_height: tileset.tile_height,
            },
            Some(tileset.image_size()),
        )?;
        self.palette_selector.reset_selection();
        self.grid_lines = tileset.grid_lines();
        self.preview = None;

        tracing::info!(tileset = %tileset.name, "tileset selected");
        let previous = std::mem::replace(&mut self.tileset, tileset);
        if !previous.name.is_empty() {
            self.cache.insert(previous.name.clone(), previous);
        }
        Ok(())
    }

    /// Consume palette clicks published since the last frame.
    pub fn update(&mut self) -> Option<(u32, u32)> {
        let last = self.palette_clicks.drain().pop()?;
        let offset = self.selected_offset();
        tracing::info!(cell = ?(last.x, last.y), ?offset, "palette tile selected");
        Some(offset)
    }

    /// All windows, indexed by [`WindowId`].
    pub fn windows(&self) -> &[EditorWindow] {
        &self.windows
    }

    /// One window by id.
    pub fn window(&self, id: WindowId) -> Option<&EditorWindow> {
        self.windows.get(id.0)
    }

    /// Flip a window's visibility, returning the new state.
    pub fn toggle_window(&mut self, id: WindowId) -> bool {
        match self.windows.get_mut(id.0) {
            Some(w) => {
                w.visible = !w.visible;
                w.visible
            }
            None => false,
        }
    }

    /// Toggle buttons plus every visible window. Call once per frame.
    pub fn draw_gui(&mut self) {
        let mut actions = Vec::new();
        let mut ui = root_ui();

        let mut x = 10.0;
        for (i, window) in self.windows.iter().enumerate() {
            if ui.button(vec2(x, 10.0), window.title.as_str()) {
                actions.push(GuiAction::ToggleWindow(WindowId(i)));
            }
            x += 100.0;
        }

        let Self {
            windows,
            fields,
            catalog,
            tileset,
            show_preview,
            ..
        } = self;

        for (i, window) in windows.iter().enumerate() {
            if !window.visible {
                continue;
            }
            let id = WindowId(i);
            widgets::Window::new(hash!("editor_window", i), window.rect.point(), window.rect.size())
                .label(&window.title)
                .titlebar(true)
                .movable(true)
                .ui(&mut ui, |ui| {
                    if id == WindowId::PROPERTIES {
                        draw_properties(ui, fields.as_mut_slice());
                    } else if id == WindowId::PALETTE {
                        if let Some(name) = draw_palette(ui, catalog, &tileset.name, &mut *show_preview) {
                            actions.push(GuiAction::SelectTileset(name));
                        }
                    }
                });
        }
        drop(ui);

        for action in actions {
            match action {
                GuiAction::ToggleWindow(id) => {
                    self.toggle_window(id);
                }
                GuiAction::SelectTileset(name) => {
                    if let Err(e) = self.load_tileset(&name) {
                        tracing::error!(error = %e, tileset = %name, "failed to load tileset");
                    }
                }
            }
        }
    }

    /// Tileset image, its grid lines and the palette selection, when the preview is shown.
    pub fn draw_preview(&mut self, surface: Rect) {
        if !self.show_preview {
            return;
        }
        let (image, lines) = self.preview.get_or_insert_with(|| {
            let image = Texture2D::from_image(&self.tileset.image);
            image.set_filter(FilterMode::Nearest);
            let lines = Texture2D::from_image(&self.grid_lines);
            lines.set_filter(FilterMode::Nearest);
            (image, lines)
        });
        let params = || DrawTextureParams {
            dest_size: Some(surface.size()),
            ..Default::default()
        };
        draw_texture_ex(image, surface.x, surface.y, WHITE, params());
        draw_texture_ex(lines, surface.x, surface.y, WHITE, params());
        self.palette_selector.draw_selection(surface);
        self.palette_selector.draw_overlay(surface);
    }

    /// Screen rectangle of the preview, scaled to fit `max` while keeping the image aspect.
    pub fn preview_surface(&self, origin: Vec2, max: Vec2) -> Rect {
        let (w, h) = self.tileset.image_size();
        if w == 0 || h == 0 {
            return Rect::new(origin.x, origin.y, 0.0, 0.0);
        }
        let scale = (max.x / w as f32).min(max.y / h as f32);
        Rect::new(origin.x, origin.y, w as f32 * scale, h as f32 * scale)
    }
}

impl TileSource for MapEditor {
    fn brush(&self) -> Brush<'_> {
        Brush {
            tileset: &self.tileset,
            offset: self.selected_offset(),
        }
    }

    fn tileset(&self, name: &str) -> Option<&Tileset> {
        if self.tileset.name == name {
            Some(&self.tileset)
        } else {
            self.cache.get(name)
        }
    }
}

fn draw_properties(ui: &mut Ui, fields: &mut [ConfigField]) {
    for (i, field) in fields.iter_mut().enumerate() {
        ui.label(None, field.label);
        ui.input_text(hash!("map_field", i), "", &mut field.input);
    }
}

fn draw_palette(
    ui: &mut Ui,
    catalog: &TilesetCatalog,
    selected: &str,
    show_preview: &mut bool,
) -> Option<String> {
    let mut picked = None;
    ui.checkbox(hash!("palette_preview"), "Show preview", show_preview);
    ui.separator();
    widgets::Group::new(hash!("palette_list"), vec2(180.0, 190.0)).ui(ui, |ui| {
        for name in catalog.names() {
            let label = if name == selected {
                format!("> {name}")
            } else {
                name.clone()
            };
            if ui.button(None, label.as_str()) {
                picked = Some(name.clone());
            }
        }
    });
    picked
}

fn parse_or_zero(text: &str) -> u32 {
    text.trim().parse().unwrap_or(0)
}
