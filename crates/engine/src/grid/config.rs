use thiserror::Error;

pub const GRID_WIDTH_MIN: u32 = 2;
pub const GRID_WIDTH_MAX: u32 = 1024;
pub const DEFAULT_GRID_WIDTH: u32 = 100;
pub const DEFAULT_WORLD_SCALE: f32 = 100.0;

/// Grid dimensions for one world instance. Square grid, `width * width` cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    width: u32,
    world_scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum GridConfigError {
    #[error("grid width {width} is outside the supported range {min}..={max}")]
    WidthOutOfRange { width: u32, min: u32, max: u32 },
    #[error("world scale {world_scale} must be finite and greater than zero")]
    WorldScaleOutOfRange { world_scale: f32 },
}

impl GridConfig {
    pub fn new(width: u32, world_scale: f32) -> Result<Self, GridConfigError> {
        if !(GRID_WIDTH_MIN..=GRID_WIDTH_MAX).contains(&width) {
            return Err(GridConfigError::WidthOutOfRange {
                width,
                min: GRID_WIDTH_MIN,
                max: GRID_WIDTH_MAX,
            });
        }
        if !world_scale.is_finite() || world_scale <= 0.0 {
            return Err(GridConfigError::WorldScaleOutOfRange { world_scale });
        }
        Ok(Self { width, world_scale })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn world_scale(&self) -> f32 {
        self.world_scale
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.width as usize
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_WIDTH,
            world_scale: DEFAULT_WORLD_SCALE,
        }
    }
}
