//! Application entry point and dispatch.

use std::io::{self, Write};

use anyhow::Result;
use clap_complete::generate;
use tracing::info;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::output::{write_json, write_table};
use crate::simulation::Simulation;

/// Run the application.
pub fn run(config: &AppConfig) -> Result<()> {
    // Handle shell completion
    if let Some(shell) = config.completion {
        let mut cmd = <AppConfig as clap::CommandFactory>::command();
        generate(shell, &mut cmd, "respool", &mut io::stdout());
        return Ok(());
    }

    validate(config)?;

    info!(
        pools = config.pools,
        ticks = config.ticks,
        policy = ?config.policy,
        "starting churn simulation"
    );
    let report = Simulation::new(config).run(config.ticks)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let written = if config.json {
        write_json(&report, &mut out)
    } else {
        write_table(&report, &mut out)
    };
    written.and_then(|()| out.flush()).map_err(AppError::from)?;
    Ok(())
}

fn validate(config: &AppConfig) -> Result<(), AppError> {
    if config.pools == 0 {
        return Err(AppError::Config("--pools must be at least 1".into()));
    }
    if !config.shrink_interval.trim().is_empty() && config.shrink_duration().is_none() {
        return Err(AppError::Config(format!(
            "unparseable --shrink-interval {:?}",
            config.shrink_interval
        )));
    }
    if config.tick_duration_checked().is_none() {
        return Err(AppError::Config(format!(
            "unparseable --tick {:?}",
            config.tick
        )));
    }
    Ok(())
}
