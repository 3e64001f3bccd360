use std::sync::Arc;

use crate::world::EntityId;

use super::buried::BuriedItem;
use super::coord::GridCoordinate;
use super::terrain::{DetectionSignal, TerrainType};

/// One dense array per data layer, all indexed by `y * width + x`.
#[derive(Debug, Clone)]
pub(crate) struct CellLayers {
    width: u32,
    pub(crate) terrain: Vec<TerrainType>,
    pub(crate) elevation: Vec<i32>,
    pub(crate) occupant: Vec<Option<EntityId>>,
    pub(crate) buried: Vec<Option<Arc<BuriedItem>>>,
    pub(crate) detection: Vec<DetectionSignal>,
}

impl CellLayers {
    pub(crate) fn new(width: u32) -> Self {
        let count = width as usize * width as usize;
        Self {
            width,
            terrain: vec![TerrainType::default(); count],
            elevation: vec![0; count],
            occupant: vec![None; count],
            buried: vec![None; count],
            detection: vec![DetectionSignal::NONE; count],
        }
    }

    pub(crate) fn index_of(&self, coord: GridCoordinate) -> Option<usize> {
        let width = self.width as i32;
        if coord.x < 0 || coord.y < 0 || coord.x >= width || coord.y >= width {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    pub(crate) fn occupied_count(&self) -> usize {
        self.occupant.iter().filter(|cell| cell.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_is_row_major() {
        let layers = CellLayers::new(4);
        assert_eq!(layers.index_of(GridCoordinate::new(0, 0)), Some(0));
        assert_eq!(layers.index_of(GridCoordinate::new(3, 0)), Some(3));
        assert_eq!(layers.index_of(GridCoordinate::new(0, 1)), Some(4));
        assert_eq!(layers.index_of(GridCoordinate::new(3, 3)), Some(15));
    }

    #[test]
    fn index_rejects_out_of_bounds() {
        let layers = CellLayers::new(4);
        assert_eq!(layers.index_of(GridCoordinate::new(4, 0)), None);
        assert_eq!(layers.index_of(GridCoordinate::new(0, 4)), None);
        assert_eq!(layers.index_of(GridCoordinate::INVALID), None);
    }

    #[test]
    fn all_layers_sized_to_cell_count() {
        let layers = CellLayers::new(5);
        assert_eq!(layers.terrain.len(), 25);
        assert_eq!(layers.elevation.len(), 25);
        assert_eq!(layers.occupant.len(), 25);
        assert_eq!(layers.buried.len(), 25);
        assert_eq!(layers.detection.len(), 25);
        assert_eq!(layers.occupied_count(), 0);
    }
}
