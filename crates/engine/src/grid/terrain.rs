use serde::Deserialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainType {
    #[default]
    Sand,
    Dirt,
    Rock,
    Water,
    /// Returned for queries outside the grid. Never stored in a cell.
    OutOfBounds,
}

/// Per-cell signal broadcast by a buried item. `(0,0)` means no signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DetectionSignal {
    pub rarity: i32,
    /// Chebyshev distance to the item, 0 on top of it.
    pub distance: i32,
}

impl DetectionSignal {
    pub const NONE: Self = Self {
        rarity: 0,
        distance: 0,
    };

    pub fn is_detectable(self) -> bool {
        self.rarity > 0
    }
}
