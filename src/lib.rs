pub mod config;
pub mod error;
pub mod runner;
pub mod sequencer;
pub mod task;
