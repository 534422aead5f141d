use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use wastebin_kernel::SystemRegistry;
use wastebin_scenario::Scenario;

#[derive(Parser)]
#[command(name = "wastebin-cli", about = "Run waste bin scenarios")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version info
    Info,
    /// List registered systems and their aliases
    Systems,
    /// Run a scenario file and report removed models
    Run {
        /// Path to a YAML scenario
        scenario: PathBuf,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Override the scenario duration, in seconds
        #[arg(short, long)]
        duration: Option<f64>,
    },
}

fn registry() -> anyhow::Result<SystemRegistry> {
    let mut registry = SystemRegistry::new();
    wastebin_system::register(&mut registry)?;
    Ok(registry)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => {
            println!("wastebin-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("system: {}", wastebin_system::SYSTEM_NAME);
        }
        Commands::Systems => {
            let registry = registry()?;
            for name in registry.names() {
                let aliases = registry.aliases_of(name);
                if aliases.is_empty() {
                    println!("{name}");
                } else {
                    println!("{name} (aliases: {})", aliases.join(", "));
                }
            }
        }
        Commands::Run {
            scenario,
            json,
            duration,
        } => {
            let mut loaded = Scenario::load(&scenario)
                .with_context(|| format!("failed to load {}", scenario.display()))?;
            if let Some(duration) = duration {
                loaded.duration = duration;
            }
            tracing::info!(
                path = %scenario.display(),
                models = loaded.models.len(),
                steps = loaded.step_count(),
                "running scenario"
            );

            let report = loaded.run(&registry()?)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
        }
    }

    Ok(())
}
