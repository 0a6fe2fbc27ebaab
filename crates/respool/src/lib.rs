//! respool library: churn simulator driving typed instance pools.

pub mod app;
pub mod config;
pub mod errors;
pub mod output;
pub mod simulation;
