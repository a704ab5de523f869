pub mod plan;
pub mod reels;
pub mod reports;
pub mod seeds;
pub mod simulation;

pub use plan::DistributionPlan;
pub use reels::CsvReelSource;
pub use seeds::{SeedInfo, resolve_seed_inputs};
pub use simulation::{
    SimulationOptions, SimulationReport, expand_modes, replay_trial, run_simulation,
};
