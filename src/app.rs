use crate::config::EditorConfig;
use crate::document::MapDocument;
use crate::editor::MapEditor;
use crate::events::EventRouter;
use crate::map::Map;
use crate::tileset::TilesetCatalog;
use anyhow::Context;
use macroquad::prelude::*;
use macroquad::ui::root_ui;

const MAP_ORIGIN: Vec2 = Vec2::new(420.0, 40.0);
const PREVIEW_MAX: Vec2 = Vec2::new(280.0, 280.0);
const PREVIEW_MARGIN: f32 = 20.0;

/// Owns the editor, the map and the router between them, and runs one frame at a time.
pub struct EditorApp {
    config: EditorConfig,
    router: EventRouter,
    editor: MapEditor,
    map: Map,
}

impl EditorApp {
    /// Discover tilesets and build the editor and map from `config`.
    pub fn new(config: EditorConfig) -> anyhow::Result<Self> {
        let mut router = EventRouter::new();
        let catalog = TilesetCatalog::discover(&config.resource_dir).with_context(|| {
            format!("Discovering tilesets in {}", config.resource_dir.display())
        })?;
        let editor = MapEditor::new(
            catalog,
            config.default_tileset.as_deref(),
            &config.map,
            &mut router,
            &config.palette_channel,
        )
        .context("Creating map editor")?;
        let map = Map::new(config.map.clone(), &mut router, &config.map_channel);

        Ok(Self {
            config,
            router,
            editor,
            map,
        })
    }

    /// The editor half.
    pub fn editor(&self) -> &MapEditor {
        &self.editor
    }

    /// The map being edited.
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Save the map to the configured document path.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = &self.config.document_path;
        MapDocument::from_map(&self.map)
            .save(path)
            .with_context(|| format!("Saving map to {}", path.display()))
    }

    /// Replace the map with the document at the configured path, loading the
    /// tilesets it refers to.
    pub fn load(&mut self) -> anyhow::Result<()> {
        let path = &self.config.document_path;
        let doc =
            MapDocument::load(path).with_context(|| format!("Loading map {}", path.display()))?;
        let missing = self.editor.preload_tilesets(doc.tileset_names());
        if !missing.is_empty() {
            tracing::warn!(?missing, "map refers to tilesets that are not in the catalog");
        }
        doc.apply_to(&mut self.map);
        Ok(())
    }

    fn preview_surface(&self) -> Rect {
        let origin = vec2(screen_width() - PREVIEW_MAX.x - PREVIEW_MARGIN, MAP_ORIGIN.y);
        self.editor.preview_surface(origin, PREVIEW_MAX)
    }

    /// Input, then rebuild/paint, then drawing.
    pub fn frame(&mut self) {
        let mouse: Vec2 = mouse_position().into();
        let over_ui = root_ui().is_mouse_over(mouse);
        let clicked = is_mouse_button_pressed(MouseButton::Left) && !over_ui;

        let map_surface = self.map.surface(MAP_ORIGIN, self.config.map_zoom);
        let preview_surface = self.preview_surface();

        self.map
            .selector_mut()
            .handle_pointer(map_surface, mouse, clicked, &mut self.router);
        if self.editor.show_preview() {
            self.editor.palette_selector_mut().handle_pointer(
                preview_surface,
                mouse,
                clicked,
                &mut self.router,
            );
        }

        let ctrl = is_key_down(KeyCode::LeftControl) || is_key_down(KeyCode::RightControl);
        if ctrl && is_key_pressed(KeyCode::S) {
            if let Err(e) = self.save() {
                tracing::error!("{e:#}");
            }
        }
        if ctrl && is_key_pressed(KeyCode::O) {
            if let Err(e) = self.load() {
                tracing::error!("{e:#}");
            }
        }

        self.editor.update();
        self.editor.apply_field_edits(&mut self.map);
        self.map.update(&self.editor);

        clear_background(Color::from_rgba(30, 30, 36, 255));
        // size may have changed during update
        let map_surface = self.map.surface(MAP_ORIGIN, self.config.map_zoom);
        self.map.draw(map_surface);
        self.editor.draw_preview(preview_surface);

        let cfg = self.map.config();
        draw_text(
            &format!(
                "{}  {}x{} @ {}x{}",
                cfg.map_name, cfg.columns, cfg.rows, cfg.tile_width, cfg.tile_height
            ),
            MAP_ORIGIN.x,
            MAP_ORIGIN.y - 10.0,
            20.0,
            WHITE,
        );
        self.editor.draw_gui();
    }
}
