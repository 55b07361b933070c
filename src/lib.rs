pub mod agent;
pub mod builds;
pub mod config;
pub mod dedup;
pub mod genetics;
pub mod market;
pub mod matcher;
pub mod monitoring;
