//! Named volume groups.

use serde::{Deserialize, Serialize};

/// Volume multiplier shared by every voice tagged with `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    volume: f32,
}

impl Category {
    /// Volume is clamped to [0, 1].
    pub fn new(name: impl Into<String>, volume: f32) -> Self {
        Self {
            name: name.into(),
            volume: volume.clamp(0.0, 1.0),
        }
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }
}

/// Product of the volumes of every registered category in `tags`.
/// Unregistered tags contribute nothing.
pub(crate) fn category_gain(categories: &[Category], tags: &[String]) -> f32 {
    categories
        .iter()
        .filter(|c| tags.iter().any(|t| *t == c.name))
        .map(Category::volume)
        .product()
}
