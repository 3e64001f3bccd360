use engine::{DebugColor, EntityId, EntityKind, GridError, PlaceableDef, Vec3};
use thiserror::Error;
use tracing::{error, info};

use super::session::{CellAnchor, GridSpawnRequest, Session};

const PLACE_MARKER_SECONDS: f32 = 5.0;

#[derive(Debug, Error, PartialEq)]
pub(crate) enum PlaceItemError {
    #[error("unknown placeable def '{def_name}'")]
    UnknownDef { def_name: String },
    #[error("placement probe for '{def_name}' is not on the grid")]
    ProbeOffGrid { def_name: String },
    #[error(transparent)]
    Grid(#[from] GridError),
}

impl Session {
    /// Places a placeable in front of `origin`. The probe sits one footprint
    /// length along `facing`, which is expected to be a unit vector.
    pub(crate) fn try_place_item(
        &mut self,
        def_name: &str,
        origin: Vec3,
        facing: Vec3,
    ) -> Result<EntityId, PlaceItemError> {
        let Some(def) = self.defs.placeable(def_name).cloned() else {
            return Err(PlaceItemError::UnknownDef {
                def_name: def_name.to_string(),
            });
        };
        self.place_def(&def, origin, facing)
    }

    fn place_def(
        &mut self,
        def: &PlaceableDef,
        origin: Vec3,
        facing: Vec3,
    ) -> Result<EntityId, PlaceItemError> {
        let reach = def.footprint.x.max(def.footprint.y) as f32 * self.grid.config().world_scale();
        let probe = origin + facing * reach;

        let Some(position) = self.grid.grid_position_at(probe) else {
            error!(def_name = %def.def_name, "place_item_probe_off_grid");
            return Err(PlaceItemError::ProbeOffGrid {
                def_name: def.def_name.clone(),
            });
        };
        let marker = self
            .grid
            .debug_draw_position(position, PLACE_MARKER_SECONDS, DebugColor::Blue);
        self.world.push_debug_marker(marker);

        let (id, placement) = self.spawn_on_grid(GridSpawnRequest {
            debug_name: def.label.clone(),
            kind: EntityKind::Placeable,
            footprint: def.footprint,
            desired: position,
            allow_adjust: true,
            anchor: CellAnchor::Corner,
            pickup: None,
        })?;
        info!(
            id = id.0,
            def_name = %def.def_name,
            position = %placement.position,
            adjusted = placement.adjusted,
            "item_placed"
        );
        Ok(id)
    }
}
