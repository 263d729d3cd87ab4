//! Command-line configuration.

use crate::commands::Command;
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Inspect and exercise protocol stack descriptors.
#[derive(Parser, Debug, Clone)]
#[command(name = "stackctl", version, about)]
pub struct CliConfig {
    /// Log filter, e.g. `debug` or `channel=trace`; overrides RUST_LOG
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub fn run(&self) -> anyhow::Result<()> {
        init_tracing(self.log_level.as_deref());
        let output = self.command.execute()?;
        print!("{output}");
        Ok(())
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
