use std::collections::HashMap;
use std::sync::Arc;

use crate::grid::{BuriedItem, GridCoordinate};

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceableDef {
    pub def_name: String,
    pub label: String,
    pub footprint: GridCoordinate,
}

/// Compiled definitions, resolved eagerly so nothing downstream loads lazily.
#[derive(Debug, Default, Clone)]
pub struct DefDatabase {
    buried_items: HashMap<String, Arc<BuriedItem>>,
    placeables: HashMap<String, PlaceableDef>,
}

impl DefDatabase {
    pub(crate) fn from_defs(
        buried_items: impl IntoIterator<Item = BuriedItem>,
        placeables: impl IntoIterator<Item = PlaceableDef>,
    ) -> Self {
        Self {
            buried_items: buried_items
                .into_iter()
                .map(|item| (item.def_name.clone(), Arc::new(item)))
                .collect(),
            placeables: placeables
                .into_iter()
                .map(|def| (def.def_name.clone(), def))
                .collect(),
        }
    }

    pub fn buried_item(&self, def_name: &str) -> Option<Arc<BuriedItem>> {
        self.buried_items.get(def_name).cloned()
    }

    pub fn placeable(&self, def_name: &str) -> Option<&PlaceableDef> {
        self.placeables.get(def_name)
    }

    pub fn buried_item_count(&self) -> usize {
        self.buried_items.len()
    }

    pub fn placeable_count(&self) -> usize {
        self.placeables.len()
    }
}
