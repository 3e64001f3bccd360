use std::fmt;
use std::ops::Add;

use serde::Deserialize;

/// Integer cell address. Valid in-bounds coordinates are always `>= 0`, so
/// `(-1,-1)` doubles as the "unset" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
pub struct GridCoordinate {
    pub x: i32,
    pub y: i32,
}

impl GridCoordinate {
    pub const INVALID: Self = Self { x: -1, y: -1 };
    pub const ONE: Self = Self { x: 1, y: 1 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(rhs.x)?,
            y: self.y.checked_add(rhs.y)?,
        })
    }

    /// Chebyshev distance, `max(|dx|, |dy|)`.
    pub fn chebyshev_distance(self, other: Self) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }
}

impl Default for GridCoordinate {
    fn default() -> Self {
        Self::INVALID
    }
}

impl Add for GridCoordinate {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl fmt::Display for GridCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Visits every cell of the half-open rectangle `[start, end)`, Y outer and
/// X inner.
pub(crate) fn cells_in_rect(
    start: GridCoordinate,
    end: GridCoordinate,
) -> impl Iterator<Item = GridCoordinate> {
    (start.y..end.y).flat_map(move |y| (start.x..end.x).map(move |x| GridCoordinate { x, y }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_the_invalid_sentinel() {
        let coord = GridCoordinate::default();
        assert_eq!(coord, GridCoordinate::new(-1, -1));
        assert_eq!(coord, GridCoordinate::INVALID);
    }

    #[test]
    fn addition_is_component_wise() {
        let sum = GridCoordinate::new(3, -2) + GridCoordinate::new(1, 5);
        assert_eq!(sum, GridCoordinate::new(4, 3));
        assert_eq!(
            GridCoordinate::new(3, -2).checked_add(GridCoordinate::new(1, 5)),
            Some(sum)
        );
        assert_eq!(
            GridCoordinate::new(i32::MAX, 0).checked_add(GridCoordinate::ONE),
            None
        );
    }

    #[test]
    fn chebyshev_distance_takes_the_larger_axis() {
        let origin = GridCoordinate::new(10, 10);
        assert_eq!(origin.chebyshev_distance(GridCoordinate::new(10, 10)), 0);
        assert_eq!(origin.chebyshev_distance(GridCoordinate::new(11, 9)), 1);
        assert_eq!(origin.chebyshev_distance(GridCoordinate::new(13, 8)), 3);
    }

    #[test]
    fn rect_iteration_is_row_major_and_half_open() {
        let cells: Vec<_> =
            cells_in_rect(GridCoordinate::new(1, 1), GridCoordinate::new(3, 3)).collect();
        assert_eq!(
            cells,
            vec![
                GridCoordinate::new(1, 1),
                GridCoordinate::new(2, 1),
                GridCoordinate::new(1, 2),
                GridCoordinate::new(2, 2),
            ]
        );
        assert_eq!(
            cells_in_rect(GridCoordinate::new(2, 2), GridCoordinate::new(2, 5)).count(),
            0
        );
    }
}
