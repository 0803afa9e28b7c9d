//! Type Instantiation CLI
//!
//! Instantiates JSON-encoded schema contexts and reports reference cycles.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use familiar_type_engine::config::{EngineConfig, OutputFormat};
use familiar_type_engine::engine::is_cyclic;
use familiar_type_engine::node::{reference, Context};
use familiar_type_engine::ReferenceGraph;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "type-instantiate")]
#[command(about = "Instantiate schema expressions and inspect their references")]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print compact JSON regardless of configuration
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Instantiate every definition of a context as one module
    Module {
        /// JSON file holding the context (name -> node)
        file: PathBuf,
    },

    /// Instantiate a single definition
    Eval {
        /// JSON file holding the context (name -> node)
        file: PathBuf,
        /// Definition to instantiate
        #[arg(short, long)]
        entry: String,
        /// Print the result in type notation instead of JSON
        #[arg(long)]
        display: bool,
    },

    /// Report reference cycles and cyclic definitions
    Cycles {
        /// JSON file holding the context (name -> node)
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli
        .config
        .as_deref()
        .map(|p| p.to_str().context("config path is not valid UTF-8"))
        .transpose()?;
    let config = EngineConfig::load_from(config_path).context("failed to load configuration")?;
    let format = if cli.compact {
        OutputFormat::Compact
    } else {
        config.output.format
    };
    let engine = config.instantiator();

    match cli.command {
        Commands::Module { file } => {
            let context = load_context(&file)?;
            let module = engine.instantiate_module(&context)?;
            print_json(&module, format)?;
        }

        Commands::Eval { file, entry, display } => {
            let context = load_context(&file)?;
            if !context.contains(&entry) {
                anyhow::bail!("definition '{}' not found in {}", entry, file.display());
            }
            let node = engine.instantiate(&context, &reference(entry))?;
            if display {
                println!("{}", node);
            } else {
                print_json(&node, format)?;
            }
        }

        Commands::Cycles { file } => {
            let context = load_context(&file)?;
            let graph = ReferenceGraph::from_context(&context);
            println!(
                "📊 {} definitions, {} reference edges",
                context.len(),
                graph.edge_count()
            );
            let undefined = graph.name_count().saturating_sub(context.len());
            if undefined > 0 {
                println!("⚠️  {} referenced name(s) not defined in the file", undefined);
            }

            let groups = graph.scc_groups();
            if groups.is_empty() {
                println!("✅ No reference cycles");
            } else {
                println!("🔁 {} reference cycle(s):", groups.len());
                for group in &groups {
                    println!("   {}", group.join(" <-> "));
                }
            }

            let cyclic: Vec<&str> = context.names().filter(|name| is_cyclic(&context, name)).collect();
            if !cyclic.is_empty() {
                println!("📦 Packaged as cyclic bundles:");
                for name in cyclic {
                    println!("   {} -> {}", name, graph.refs_out(name).join(", "));
                }
            }
        }
    }

    Ok(())
}

fn load_context(path: &Path) -> Result<Context> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

fn print_json<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let output = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };
    println!("{}", output);
    Ok(())
}
