use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{info, warn};

use super::{LoopCommand, Simulation};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    /// Upper bound on ticks before the loop stops on its own.
    pub max_ticks: u64,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    /// When false, ticks run back to back without sleeping.
    pub realtime: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_ticks: 600,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            realtime: false,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoopError {
    #[error("target_tps must be at least 1")]
    ZeroTargetTps,
    #[error("max_ticks must be at least 1")]
    ZeroMaxTicks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TickLimit,
    Requested,
}

#[derive(Debug, Clone, Copy)]
pub struct LoopSummary {
    pub ticks_run: u64,
    pub stop_reason: StopReason,
    pub wall_time: Duration,
}

pub fn run_headless<S: Simulation + ?Sized>(
    config: &LoopConfig,
    simulation: &mut S,
) -> Result<LoopSummary, LoopError> {
    if config.target_tps == 0 {
        return Err(LoopError::ZeroTargetTps);
    }
    if config.max_ticks == 0 {
        return Err(LoopError::ZeroMaxTicks);
    }

    let fixed_dt = Duration::from_secs_f64(1.0 / config.target_tps as f64);
    let fixed_dt_seconds = fixed_dt.as_secs_f32();
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);

    info!(
        target_tps = config.target_tps,
        max_ticks = config.max_ticks,
        realtime = config.realtime,
        "loop_config"
    );

    let started = Instant::now();
    simulation.begin();

    let mut ticks_run = 0u64;
    let mut stop_reason = StopReason::TickLimit;
    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();

    'frames: while ticks_run < config.max_ticks {
        let ticks_this_frame = if config.realtime {
            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
            last_frame_instant = now;
            accumulator = accumulator.saturating_add(raw_frame_dt.min(max_frame_delta));

            let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
            accumulator = step_plan.remaining_accumulator;
            if step_plan.dropped_backlog > Duration::ZERO {
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame, "sim_clamp_triggered"
                );
            }
            step_plan.ticks_to_run
        } else {
            1
        };

        for _ in 0..ticks_this_frame {
            let command = simulation.update(fixed_dt_seconds);
            ticks_run += 1;
            if command == LoopCommand::Stop {
                info!(ticks_run, "shutdown_requested");
                stop_reason = StopReason::Requested;
                break 'frames;
            }
            if ticks_run >= config.max_ticks {
                break 'frames;
            }
        }

        if config.realtime {
            let sleep_for = fixed_dt.saturating_sub(accumulator);
            if sleep_for > Duration::ZERO {
                thread::sleep(sleep_for);
            }
        }
    }

    simulation.end();
    let summary = LoopSummary {
        ticks_run,
        stop_reason,
        wall_time: started.elapsed(),
    };
    info!(
        ticks_run,
        stop_reason = ?summary.stop_reason,
        wall_time_ms = summary.wall_time.as_millis() as u64,
        "shutdown"
    );
    Ok(summary)
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}
