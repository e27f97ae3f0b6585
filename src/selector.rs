use crate::error::EditorError;
use crate::events::{EventRouter, GridEvent};
use macroquad::prelude::*;

/// Number of addressable cells along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct GridSize {
    pub rows: u32,
    pub columns: u32,
}

/// How a selector learns its grid: explicit cell counts, or a tile pixel size
/// applied to the backing image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum GridDimensions {
    Cells { rows: u32, columns: u32 },
    TileSize { tile_width: u32, tile_height: u32 },
}

/// Maps a pointer over a rectangular surface to a (column, row) cell and
/// announces confirmed clicks on its message channel.
#[derive(Debug, Clone)]
pub struct GridBoxSelector {
    /// Channel confirmed clicks are published on.
    pub message_id: String,
    /// Publish on confirm, or only update the selection.
    pub send_message_when_clicked: bool,
    size: Option<GridSize>,
    hover_x: u32,
    hover_y: u32,
    selected_x: u32,
    selected_y: u32,
    overlay_scale: Vec2,
    overlay_visible: bool,
    pointer_inside: bool,
}

impl GridBoxSelector {
    /// Unconfigured selector publishing on `message_id`.
    pub fn new(message_id: impl Into<String>) -> Self {
        GridBoxSelector {
            message_id: message_id.into(),
            send_message_when_clicked: true,
            size: None,
            hover_x: 0,
            hover_y: 0,
            selected_x: 0,
            selected_y: 0,
            overlay_scale: Vec2::ONE,
            overlay_visible: false,
            pointer_inside: false,
        }
    }

    /// Grid size, `None` until dimensions are set.
    pub fn size(&self) -> Option<GridSize> {
        self.size
    }

    /// Hovered (column, row).
    pub fn hover(&self) -> (u32, u32) {
        (self.hover_x, self.hover_y)
    }

    /// Last confirmed (column, row).
    pub fn selected(&self) -> (u32, u32) {
        (self.selected_x, self.selected_y)
    }

    /// Fraction of the surface one cell covers along each axis.
    pub fn overlay_scale(&self) -> Vec2 {
        self.overlay_scale
    }

    /// Whether the pointer is over the surface.
    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Configure the grid. On error the selector is left unconfigured, so
    /// clicks are refused until a valid size arrives.
    pub fn set_dimensions(
        &mut self,
        dims: GridDimensions,
        image_size: Option<(u32, u32)>,
    ) -> Result<GridSize, EditorError> {
        let size = match Self::resolve(dims, image_size) {
            Ok(size) => size,
            Err(e) => {
                self.size = None;
                return Err(e);
            }
        };

        self.overlay_scale = vec2(1.0 / size.columns as f32, 1.0 / size.rows as f32);
        self.size = Some(size);
        self.hover_x = self.hover_x.min(size.columns - 1);
        self.hover_y = self.hover_y.min(size.rows - 1);
        tracing::debug!(
            selector = %self.message_id,
            rows = size.rows,
            columns = size.columns,
            "grid dimensions set"
        );
        Ok(size)
    }

    fn resolve(
        dims: GridDimensions,
        image_size: Option<(u32, u32)>,
    ) -> Result<GridSize, EditorError> {
        let size = match dims {
            GridDimensions::Cells { rows, columns } => GridSize { rows, columns },
            GridDimensions::TileSize {
                tile_width,
                tile_height,
            } => {
                if tile_width == 0 || tile_height == 0 {
                    return Err(EditorError::InvalidDimensions(format!(
                        "tile size {tile_width}x{tile_height}"
                    )));
                }
                let (w, h) = image_size.ok_or_else(|| {
                    EditorError::InvalidDimensions("tile size given without an image size".into())
                })?;
                GridSize {
                    rows: h / tile_height,
                    columns: w / tile_width,
                }
            }
        };
        if size.rows == 0 || size.columns == 0 {
            return Err(EditorError::InvalidDimensions(format!(
                "{} rows x {} columns",
                size.rows, size.columns
            )));
        }
        Ok(size)
    }

    /// Hover and selection back to (0, 0).
    pub fn reset_selection(&mut self) {
        self.hover_x = 0;
        self.hover_y = 0;
        self.selected_x = 0;
        self.selected_y = 0;
    }

    /// Pointer entered the surface.
    pub fn on_enter(&mut self) {
        self.overlay_visible = true;
    }

    /// Pointer left the surface.
    pub fn on_exit(&mut self) {
        self.overlay_visible = false;
    }

    /// Update the hovered cell from a pointer position in surface UV space.
    pub fn on_hover(&mut self, uv: Vec2) -> (u32, u32) {
        if let Some(size) = self.size {
            let u = uv.x.clamp(0.0, 1.0);
            let v = uv.y.clamp(0.0, 1.0);
            // u == 1.0 lands on the far edge, keep it in the last cell
            self.hover_x = ((u * size.columns as f32).floor() as u32).min(size.columns - 1);
            self.hover_y = ((v * size.rows as f32).floor() as u32).min(size.rows - 1);
        }
        (self.hover_x, self.hover_y)
    }

    /// Promote the hovered cell to the selection and publish it.
    ///
    /// Returns `None` without touching any state when the grid was never
    /// configured.
    pub fn on_confirm(&mut self, router: &mut EventRouter) -> Option<GridEvent> {
        if self.size.is_none() {
            tracing::error!(
                selector = %self.message_id,
                "grid clicked before row or column properties are set"
            );
            return None;
        }

        self.selected_x = self.hover_x;
        self.selected_y = self.hover_y;
        let event = GridEvent::clicked(self.selected_x, self.selected_y);
        if self.send_message_when_clicked {
            router.publish(&self.message_id, event);
        }
        Some(event)
    }

    /// Feed one frame of pointer input over `surface` (screen space).
    pub fn handle_pointer(
        &mut self,
        surface: Rect,
        pointer: Vec2,
        clicked: bool,
        router: &mut EventRouter,
    ) -> Option<GridEvent> {
        let inside = surface.w > 0.0 && surface.h > 0.0 && surface.contains(pointer);
        if inside != self.pointer_inside {
            self.pointer_inside = inside;
            if inside {
                self.on_enter();
            } else {
                self.on_exit();
            }
        }
        if !inside {
            return None;
        }

        let uv = (pointer - surface.point()) / surface.size();
        self.on_hover(uv);
        if clicked {
            self.on_confirm(router)
        } else {
            None
        }
    }

    /// Screen rectangle of cell (x, y) on `surface`.
    pub fn cell_rect(&self, surface: Rect, x: u32, y: u32) -> Option<Rect> {
        let size = self.size?;
        let cell = surface.size() * self.overlay_scale;
        Some(Rect::new(
            lerp(surface.x, surface.right(), x as f32 / size.columns as f32),
            lerp(surface.y, surface.bottom(), y as f32 / size.rows as f32),
            cell.x,
            cell.y,
        ))
    }

    /// Where the hover overlay sits on `surface`.
    pub fn overlay_rect(&self, surface: Rect) -> Option<Rect> {
        self.cell_rect(surface, self.hover_x, self.hover_y)
    }

    /// Outline the hovered cell while the pointer is inside.
    pub fn draw_overlay(&self, surface: Rect) {
        if !self.overlay_visible {
            return;
        }
        if let Some(r) = self.overlay_rect(surface) {
            draw_rectangle_lines(r.x, r.y, r.w, r.h, 2.0, YELLOW);
        }
    }

    /// Outline the selected cell.
    pub fn draw_selection(&self, surface: Rect) {
        if let Some(r) = self.cell_rect(surface, self.selected_x, self.selected_y) {
            draw_rectangle_lines(r.x, r.y, r.w, r.h, 2.0, RED);
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::GridEventKind;

    fn tileset_selector() -> GridBoxSelector {
        let mut sel = GridBoxSelector::new("Palette");
        sel.set_dimensions(
            GridDimensions::TileSize {
                tile_width: 16,
                tile_height: 16,
            },
            Some((64, 32)),
        )
        .expect("valid dimensions");
        sel
    }

    #[test]
    fn tile_size_divides_image_into_cells() {
        let sel = tileset_selector();
        assert_eq!(sel.size(), Some(GridSize { rows: 2, columns: 4 }));
        assert_eq!(sel.overlay_scale(), vec2(0.25, 0.5));
    }

    #[test]
    fn hover_picks_cell_under_pointer() {
        let mut sel = tileset_selector();
        assert_eq!(sel.on_hover(vec2(0.6, 0.4)), (2, 0));
    }

    #[test]
    fn hover_is_idempotent() {
        let mut sel = tileset_selector();
        let surface = Rect::new(10.0, 20.0, 128.0, 64.0);
        let first = sel.on_hover(vec2(0.6, 0.9));
        let first_rect = sel.overlay_rect(surface);
        let second = sel.on_hover(vec2(0.6, 0.9));
        assert_eq!(first, second);
        assert_eq!(first_rect, sel.overlay_rect(surface));
        assert_eq!(first, (2, 1));
    }

    #[test]
    fn hover_on_far_edge_stays_in_grid() {
        let mut sel = tileset_selector();
        assert_eq!(sel.on_hover(vec2(1.0, 1.0)), (3, 1));
    }

    #[test]
    fn overlay_spans_exactly_one_cell() {
        let mut sel = tileset_selector();
        sel.on_hover(vec2(0.6, 0.9));
        let r = sel.overlay_rect(Rect::new(10.0, 20.0, 128.0, 64.0)).unwrap();
        assert_eq!(r, Rect::new(74.0, 52.0, 32.0, 32.0));
    }

    #[test]
    fn confirm_before_dimensions_is_a_no_op() {
        let mut router = EventRouter::new();
        let sub = router.subscribe("Map", GridEventKind::GridClicked);
        let mut sel = GridBoxSelector::new("Map");
        sel.on_hover(vec2(0.9, 0.9));

        assert!(sel.on_confirm(&mut router).is_none());
        assert_eq!(sel.selected(), (0, 0));
        assert_eq!(sel.hover(), (0, 0));
        assert!(sub.is_empty());
    }

    #[test]
    fn confirm_publishes_selected_cell() {
        let mut router = EventRouter::new();
        let sub = router.subscribe("Palette", GridEventKind::GridClicked);
        let mut sel = tileset_selector();
        sel.on_hover(vec2(0.8, 0.7));

        let event = sel.on_confirm(&mut router).expect("configured");
        assert_eq!((event.x, event.y), (3, 1));
        assert_eq!(sel.selected(), (3, 1));
        assert_eq!(sub.drain(), vec![event]);
    }

    #[test]
    fn silent_selector_still_selects() {
        let mut router = EventRouter::new();
        let sub = router.subscribe("Palette", GridEventKind::GridClicked);
        let mut sel = tileset_selector();
        sel.send_message_when_clicked = false;
        sel.on_hover(vec2(0.3, 0.0));
        assert!(sel.on_confirm(&mut router).is_some());
        assert_eq!(sel.selected(), (1, 0));
        assert!(sub.is_empty());
    }

    #[test]
    fn zero_tile_size_is_rejected_and_unconfigures() {
        let mut sel = tileset_selector();
        let err = sel
            .set_dimensions(
                GridDimensions::TileSize {
                    tile_width: 0,
                    tile_height: 16,
                },
                Some((64, 32)),
            )
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidDimensions(_)));
        assert!(sel.size().is_none());
    }

    #[test]
    fn tile_larger_than_image_is_rejected() {
        let mut sel = GridBoxSelector::new("Palette");
        let err = sel
            .set_dimensions(
                GridDimensions::TileSize {
                    tile_width: 128,
                    tile_height: 16,
                },
                Some((64, 32)),
            )
            .unwrap_err();
        assert!(matches!(err, EditorError::InvalidDimensions(_)));
    }

    #[test]
    fn pointer_enter_exit_toggles_overlay() {
        let mut router = EventRouter::new();
        let mut sel = tileset_selector();
        let surface = Rect::new(0.0, 0.0, 64.0, 32.0);

        sel.handle_pointer(surface, vec2(40.0, 10.0), false, &mut router);
        assert!(sel.overlay_visible());
        assert_eq!(sel.hover(), (2, 0));

        sel.handle_pointer(surface, vec2(100.0, 10.0), false, &mut router);
        assert!(!sel.overlay_visible());
    }

    #[test]
    fn click_outside_surface_does_nothing() {
        let mut router = EventRouter::new();
        let mut sel = tileset_selector();
        let surface = Rect::new(0.0, 0.0, 64.0, 32.0);
        assert!(sel
            .handle_pointer(surface, vec2(-5.0, 10.0), true, &mut router)
            .is_none());
        assert_eq!(sel.selected(), (0, 0));
    }
}
