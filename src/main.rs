use std::io;

use anyhow::{Context, Result};
use clap::Parser;

use medicine_demand::cli::{run, Cli};
use medicine_demand::config::{init_tracing, Settings};
use medicine_demand::context::ForecastContext;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings =
        Settings::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut settings);
    init_tracing(&settings.log_level, settings.log_json);

    let ctx = ForecastContext::from_settings(&settings).with_context(|| {
        format!(
            "failed to start from {} and {}",
            settings.data_path.display(),
            settings.model_path.display()
        )
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(&ctx, cli.command, cli.json, &mut out)?;

    Ok(())
}
