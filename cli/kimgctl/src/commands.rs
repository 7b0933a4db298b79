//! CLI commands.

use std::sync::Arc;

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use kimg_caps::{CapSystem, MockCaps};
use kimg_image::{scenario, Context, ImageLayout, ScenarioReport};

use crate::output::{self, OutputFormat};

/// kimg - exercise the execution-image lifecycle protocol.
#[derive(Debug, Parser)]
#[command(name = "kimg")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: String,

    /// Image level descriptors, e.g. "14x1,12x4".
    ///
    /// If omitted, KIMG_IMAGE_LEVELS or the built-in layout is used.
    #[arg(long, global = true)]
    levels: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run lifecycle scenarios against the mock capability backend.
    Run {
        /// A single scenario name, e.g. IMG0003. All scenarios when omitted.
        scenario: Option<String>,
    },

    /// List registered scenarios.
    List,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let format = OutputFormat::parse(&self.format);

        match &self.command {
            Commands::Run { scenario: name } => {
                let layout = match &self.levels {
                    Some(spec) => {
                        ImageLayout::parse(spec).context("invalid --levels descriptor")?
                    }
                    None => ImageLayout::from_env().context("invalid KIMG_IMAGE_LEVELS")?,
                };
                run_scenarios(layout, name.as_deref(), format).await
            }
            Commands::List => {
                output::print_specs(scenario::all(), format);
                Ok(())
            }
        }
    }
}

async fn run_scenarios(
    layout: ImageLayout,
    name: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let specs = match name {
        Some(name) => match scenario::find(name) {
            Some(spec) => vec![spec],
            None => bail!("unknown scenario '{name}' (see `kimg list`)"),
        },
        None => scenario::all().to_vec(),
    };

    let caps = Arc::new(MockCaps::new());
    let ctx = Context::bootstrap(caps as Arc<dyn CapSystem>, layout).await?;

    let mut reports: Vec<ScenarioReport> = Vec::with_capacity(specs.len());
    for spec in &specs {
        reports.push(spec.report(&ctx).await);
    }

    output::print_reports(&reports, format);

    let failed = reports.iter().filter(|report| !report.passed).count();
    if failed > 0 {
        bail!("{failed} of {} scenarios failed", reports.len());
    }
    Ok(())
}
