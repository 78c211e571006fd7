use crate::game::GameState;
use crate::network::ConnectionState;
use macroquad::prelude::{
    clear_background, draw_circle, draw_circle_lines, draw_rectangle, draw_rectangle_lines,
    draw_text, screen_height, screen_width, Color,
};
use shared::{Rgb, DEFAULT_GRID_DIVISIONS, EMPTY_CELL_GLYPH};

const TEXT_FONT_SIZE: f32 = 20.0;
const EMPTY_LABEL_COLOR: Rgb = Rgb::new(0xcccccc);
const STATUS_OPEN: Rgb = Rgb::new(0x00e430);
const STATUS_PENDING: Rgb = Rgb::new(0xfdf900);
const STATUS_DOWN: Rgb = Rgb::new(0xe62937);

/// Drawing target the renderers paint onto.
pub trait Surface {
    fn size(&self) -> (f32, f32);
    fn clear(&mut self);
    fn draw_background(&mut self);
    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgb);
    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb);
    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Rgb);
}

/// Observer invoked by the dispatcher after every accepted state change.
pub trait Renderer {
    fn render(&mut self, state: &GameState);
}

/// Labels for the textual strategy, one row per world-map row.
pub fn text_grid(state: &GameState) -> Vec<Vec<String>> {
    state
        .world_map
        .rows()
        .iter()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Some(piece) => piece.color.hex(),
                    None => EMPTY_CELL_GLYPH.to_string(),
                })
                .collect()
        })
        .collect()
}

/// Draws the board as rows of text labels.
pub struct TextGridRenderer<S: Surface> {
    surface: S,
    font_size: f32,
}

impl<S: Surface> TextGridRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            font_size: TEXT_FONT_SIZE,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: Surface> Renderer for TextGridRenderer<S> {
    fn render(&mut self, state: &GameState) {
        self.surface.clear();

        let line_height = self.font_size * 1.5;
        let column_width = self.font_size * 4.5;

        for (y, row) in state.world_map.rows().iter().enumerate() {
            let baseline = (y + 1) as f32 * line_height;
            for (x, cell) in row.iter().enumerate() {
                let (label, color) = match cell {
                    Some(piece) => (piece.color.hex(), piece.color),
                    None => (EMPTY_CELL_GLYPH.to_string(), EMPTY_LABEL_COLOR),
                };
                self.surface.draw_text(
                    &label,
                    x as f32 * column_width + self.font_size * 0.5,
                    baseline,
                    self.font_size,
                    color,
                );
            }
        }
    }
}

/// Draws the board as coloured markers over a background.
///
/// Square size is the surface size divided by the grid dimension. With no
/// fixed `divisions` the dimension follows the current board, falling back to
/// [`DEFAULT_GRID_DIVISIONS`] while the board is empty.
pub struct SpatialRenderer<S: Surface> {
    surface: S,
    divisions: Option<usize>,
}

impl<S: Surface> SpatialRenderer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            divisions: None,
        }
    }

    pub fn with_divisions(surface: S, divisions: usize) -> Self {
        Self {
            surface,
            divisions: Some(divisions.max(1)),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Columns and rows the surface is divided into for `state`.
    pub fn grid_dimensions(&self, state: &GameState) -> (usize, usize) {
        if let Some(divisions) = self.divisions {
            return (divisions, divisions);
        }

        let or_default = |n: usize| if n == 0 { DEFAULT_GRID_DIVISIONS } else { n };
        (
            or_default(state.world_map.width()),
            or_default(state.world_map.height()),
        )
    }
}

impl<S: Surface> Renderer for SpatialRenderer<S> {
    fn render(&mut self, state: &GameState) {
        self.surface.clear();
        self.surface.draw_background();

        let (width, height) = self.surface.size();
        let (columns, rows) = self.grid_dimensions(state);
        let space_w = width / columns as f32;
        let space_h = height / rows as f32;
        let radius = space_w.min(space_h) / 2.0;

        for (x, y, piece) in state.world_map.occupied() {
            self.surface.fill_circle(
                x as f32 * space_w + space_w / 2.0,
                y as f32 * space_h + space_h / 2.0,
                radius,
                piece.color,
            );
        }
    }
}

/// Connection indicator drawn in the bottom-left corner.
pub fn draw_status<S: Surface>(surface: &mut S, status: &ConnectionState) {
    let color = match status {
        ConnectionState::Open => STATUS_OPEN,
        ConnectionState::Unopened | ConnectionState::Opening => STATUS_PENDING,
        ConnectionState::Closed | ConnectionState::Errored(_) => STATUS_DOWN,
    };

    let (_, height) = surface.size();
    let y = height - 18.0;
    surface.fill_rect(10.0, y, 8.0, 8.0, color);
    surface.draw_text(&status.to_string(), 24.0, y + 8.0, 14.0, Rgb::WHITE);
}

/// Surface backed by the macroquad window.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacroquadSurface;

fn to_color(color: Rgb) -> Color {
    let (r, g, b) = color.components();
    Color::from_rgba(r, g, b, 255)
}

impl Surface for MacroquadSurface {
    fn size(&self) -> (f32, f32) {
        (screen_width(), screen_height())
    }

    fn clear(&mut self) {
        clear_background(Color::from_rgba(26, 26, 26, 255));
    }

    fn draw_background(&mut self) {
        let (width, height) = self.size();
        draw_rectangle(0.0, 0.0, width, height, Color::from_rgba(86, 125, 70, 255));
    }

    fn fill_circle(&mut self, x: f32, y: f32, radius: f32, color: Rgb) {
        draw_circle(x, y, radius, to_color(color));
        draw_circle_lines(x, y, radius, 1.0, Color::from_rgba(0, 0, 0, 255));
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        draw_rectangle(x, y, width, height, to_color(color));
        draw_rectangle_lines(x, y, width, height, 1.0, Color::from_rgba(255, 255, 255, 255));
    }

    fn draw_text(&mut self, text: &str, x: f32, y: f32, font_size: f32, color: Rgb) {
        draw_text(text, x, y, font_size, to_color(color));
    }
}
