mod loop_runner;

pub use loop_runner::{run_headless, LoopConfig, LoopError, LoopSummary, StopReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopCommand {
    Continue,
    Stop,
}

/// Something driven by the fixed-timestep loop.
pub trait Simulation {
    fn begin(&mut self) {}
    fn update(&mut self, fixed_dt_seconds: f32) -> LoopCommand;
    fn end(&mut self) {}
}
