//! Command-line argument parsing for glue-ask.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::error::Result;
use crate::pipeline::RoutingMode;

/// Answers natural-language questions over a Glue catalog with generated SQL.
#[derive(Parser, Debug, Default)]
#[command(name = "glue-ask")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Address the HTTP server binds (overrides server.bind)
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Answer one question, print the response JSON and exit
    #[arg(long, value_name = "QUESTION")]
    pub ask: Option<String>,

    /// Use the built-in sample catalog, mock store and mock model
    #[arg(long)]
    pub mock: bool,

    /// Routing mode: static or parsed (overrides routing.mode)
    #[arg(long, value_name = "MODE")]
    pub routing: Option<String>,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Applies CLI overrides, which win over file and environment values.
    pub fn apply_to(&self, config: &mut Config) -> Result<()> {
        if self.mock {
            config.use_mock_backends();
        }
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(mode) = &self.routing {
            config.routing.mode = mode.parse::<RoutingMode>()?;
        }
        Ok(())
    }
}
