pub mod baseline;
pub mod config_builder;
pub mod events;
pub mod mutants;
pub mod output;
pub mod process;
pub mod report;
pub mod scheduler;
pub mod state;
