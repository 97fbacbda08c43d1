use serde::{Deserialize, Serialize};

use crate::geometry::ColorIndex;

/// An RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color(pub [f32; 4]);

impl Color {
    /// Creates an opaque color.
    #[must_use]
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self([r, g, b, 1.0])
    }
}

/// Maps color ids to displayable colors.
///
/// The core never interprets the ids it stores on triangles; the palette only
/// travels with the model so snapshots and project files can restore it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(vec![
            Color::rgb(0.80, 0.80, 0.80),
            Color::rgb(0.89, 0.26, 0.20),
            Color::rgb(0.20, 0.63, 0.17),
            Color::rgb(0.12, 0.47, 0.71),
        ])
    }
}

impl Palette {
    /// Creates a palette from an explicit color table.
    #[must_use]
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    /// Number of colors in the palette.
    #[must_use]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Returns `true` if the palette holds no colors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Looks up a color by id.
    #[must_use]
    pub fn color(&self, id: ColorIndex) -> Option<Color> {
        self.colors.get(usize::try_from(id).ok()?).copied()
    }

    /// Appends a color and returns its id, or `None` if the id space is full.
    pub fn add(&mut self, color: Color) -> Option<ColorIndex> {
        let id = ColorIndex::try_from(self.colors.len()).ok()?;
        self.colors.push(color);
        Some(id)
    }

    /// Replaces the color stored under `id`. Returns `false` if `id` is unknown.
    pub fn replace(&mut self, id: ColorIndex, color: Color) -> bool {
        match usize::try_from(id).ok().and_then(|i| self.colors.get_mut(i)) {
            Some(slot) => {
                *slot = color;
                true
            }
            None => false,
        }
    }

    /// All colors in id order.
    #[must_use]
    pub fn colors(&self) -> &[Color] {
        &self.colors
    }
}
