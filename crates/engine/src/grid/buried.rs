use crate::world::Pickup;

/// Descriptor for something buried in a cell. Resolved from content before
/// the grid ever sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuriedItem {
    pub def_name: String,
    /// Radius in cells that the item can be detected from.
    pub detection_radius: i32,
    pub detection_rarity: i32,
    /// Each entry has an equal chance of being dug up.
    pub rewards: Vec<Pickup>,
}

impl BuriedItem {
    pub(crate) fn validate(&self) -> Result<(), &'static str> {
        if self.detection_radius < 0 {
            return Err("detection radius must not be negative");
        }
        Ok(())
    }
}
