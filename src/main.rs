//! deckhand
//!
//! Declarative administration of cluster runtime configuration.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use deckhand::apply::{plan, Reconciler};
use deckhand::cluster::RestClusterClient;
use deckhand::config::{load_config, AppConfig, LogFormat};
use deckhand::current::fetch_current;
use deckhand::diff::{render, strip_descriptions};
use deckhand::pipeline::{DeclaredResources, LocalSource, Pipeline, SourceCache};
use deckhand::resources::ResourceSet;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Reconcile declared cluster runtime configuration against the live state
#[derive(Parser, Debug)]
#[command(name = "deckhand")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "DECKHAND_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error); overrides the config
    #[arg(long, env = "DECKHAND_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the desired resource set
    Generate {
        /// Emit the serialized document instead of text
        #[arg(long)]
        json: bool,
        /// Only include resources whose id matches this regex
        #[arg(long)]
        grep: Option<String>,
    },
    /// Print the live resource set
    Current {
        /// Emit the serialized document instead of text
        #[arg(long)]
        json: bool,
        /// Only include resources whose id matches this regex
        #[arg(long)]
        grep: Option<String>,
        /// Fetch secret values (fingerprinted on output, never shown)
        #[arg(long)]
        with_secrets: bool,
    },
    /// Show what apply would change; exits 2 when a difference exists
    Diff {
        /// Only compare resources whose id matches this regex
        #[arg(long)]
        grep: Option<String>,
        /// One line per changed id instead of the full diff
        #[arg(long)]
        ids_only: bool,
        /// Ignore description fields on both sides
        #[arg(long)]
        ignore_descriptions: bool,
        /// Fetch secret values so changed secrets show up
        #[arg(long)]
        with_secrets: bool,
    },
    /// Verify the desired set's authorization closure
    Check,
    /// Converge the cluster to the desired set
    Apply {
        /// Only apply resources whose id matches this regex
        #[arg(long)]
        grep: Option<String>,
        /// Fetch and write secret values
        #[arg(long)]
        with_secrets: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Load configuration
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging; diagnostics go to stderr, resource output to
    // stdout
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.logging.level)
        .to_string();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match config.logging.format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }

    match run(args.command, config).await {
        Ok(code) => code,
        Err(e) => {
            error!(error = %e, "run failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: AppConfig) -> deckhand::Result<ExitCode> {
    match command {
        Command::Generate { json, grep } => {
            let generated = generate(&config, grep.as_deref()).await?;
            print_set(&generated, json)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Current {
            json,
            grep,
            with_secrets,
        } => {
            let generated = generate(&config, None).await?;
            let api = RestClusterClient::new(&config.cluster)?;
            let mut current = fetch_current(&api, generated.managed(), with_secrets).await?;
            if let Some(pattern) = grep.as_deref() {
                current = current.filter(pattern)?;
            }
            print_set(&current, json)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Diff {
            grep,
            ids_only,
            ignore_descriptions,
            with_secrets,
        } => {
            let mut generated = generate(&config, grep.as_deref()).await?;
            let api = RestClusterClient::new(&config.cluster)?;
            let mut current = fetch_current(&api, generated.managed(), with_secrets).await?;
            if let Some(pattern) = grep.as_deref() {
                current = current.filter(pattern)?;
            }
            if ignore_descriptions {
                generated = strip_descriptions(&generated)?;
                current = strip_descriptions(&current)?;
            }

            let changes = plan(&generated, &current);
            if changes.is_empty() {
                println!("no changes");
                return Ok(ExitCode::SUCCESS);
            }
            println!("{}", render(&changes, ids_only));
            Ok(ExitCode::from(2))
        }

        Command::Check => {
            let generated = generate(&config, None).await?;
            let findings = deckhand::check::check_roles(&generated);
            if findings.is_empty() {
                println!("check passed ({} resources)", generated.len());
                return Ok(ExitCode::SUCCESS);
            }
            for finding in &findings {
                println!("{}", finding);
            }
            Ok(ExitCode::FAILURE)
        }

        Command::Apply { grep, with_secrets } => {
            // fail before generating anything if this run could never apply
            config.cluster.require_credentials()?;

            let generated = generate(&config, grep.as_deref()).await?;
            let api = Arc::new(RestClusterClient::new(&config.cluster)?);
            let mut current = fetch_current(api.as_ref(), generated.managed(), with_secrets).await?;
            if let Some(pattern) = grep.as_deref() {
                current = current.filter(pattern)?;
            }

            let reconciler = Reconciler::new(api);
            let applied = reconciler.reconcile(&generated, &current).await?;
            info!(applied, "reconciliation complete");
            println!("applied {} change(s)", applied);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the generation pipeline described by the configuration
async fn generate(config: &AppConfig, grep: Option<&str>) -> deckhand::Result<ResourceSet> {
    let cache = Arc::new(SourceCache::new(LocalSource::new(
        shellexpand::tilde(&config.sources.directory).as_ref(),
    )));

    let mut pipeline = Pipeline::new();
    for document in &config.sources.documents {
        pipeline.register_generator(DeclaredResources::new(Arc::clone(&cache), document));
    }

    if let Some((name, environment)) = config.active_environment() {
        environment.verify_root_url(name, &config.cluster.root_url)?;
        environment.register_modifiers(&mut pipeline)?;
    }

    let generated = pipeline.run().await?;
    match grep {
        Some(pattern) => Ok(generated.filter(pattern)?),
        None => Ok(generated),
    }
}

fn print_set(set: &ResourceSet, json: bool) -> deckhand::Result<()> {
    if json {
        let document = serde_json::to_string_pretty(set)
            .map_err(|e| deckhand::error::ResourceError::Invalid(e.to_string()))
            .map_err(deckhand::AppError::from)?;
        println!("{}", document);
    } else {
        println!("{}", set);
    }
    Ok(())
}
