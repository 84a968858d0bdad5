mod config;
mod errors;
mod intake;
mod llm_client;
mod matching;
mod models;
mod pipeline;
mod presenter;
mod store;
mod workflow;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::AppError;
use crate::intake::{collect_input, RawInput};
use crate::llm_client::OllamaClient;
use crate::matching::MatchFallback;
use crate::store::CandidateStore;
use crate::workflow::HiringWorkflow;

/// Four-step hiring assistant backed by a local inference daemon
#[derive(Parser)]
#[command(name = "hiring")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match a candidate and draft, then confirm, a job offer
    Run(RunArgs),

    /// List the built-in candidate store
    Candidates,

    /// Check that the configured models are pulled on the daemon
    Models,
}

/// Any value not given here is prompted for on stdin.
#[derive(Args)]
struct RunArgs {
    /// Desired role, e.g. "Backend Developer"
    #[arg(short, long)]
    role: Option<String>,

    /// Required years of experience
    #[arg(short, long)]
    experience: Option<String>,

    /// Budget ceiling
    #[arg(short, long)]
    budget: Option<String>,

    /// Comma-separated skill stack
    #[arg(short, long)]
    stack: Option<String>,

    /// What to do when no candidate meets budget and experience (reject | closest)
    #[arg(long)]
    fallback: Option<MatchFallback>,

    /// Print every step's output, not just the final one
    #[arg(long, conflicts_with = "json")]
    show_steps: bool,

    /// Print the whole run as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration first
    let config = Config::from_env()?;

    // Logs go to stderr so stdout carries only the result
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting hiring v{}", env!("CARGO_PKG_VERSION"));

    let store = CandidateStore::builtin();
    info!("Candidate store loaded: {} records", store.len());

    match cli.command {
        Commands::Run(args) => run(&config, &store, args).await,
        Commands::Candidates => {
            print!("{}", presenter::render_candidates(&store));
            Ok(())
        }
        Commands::Models => check_models(&config).await,
    }
}

async fn run(config: &Config, store: &CandidateStore, args: RunArgs) -> Result<()> {
    let preset = RawInput {
        role: args.role,
        experience: args.experience,
        budget: args.budget,
        stack: args.stack,
    };

    // Prompting blocks on stdin
    let input = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        collect_input(&mut stdin.lock(), &mut stdout.lock(), &preset)
    })
    .await
    .context("Input collection task failed")?
    .map_err(AppError::from)?;

    let fallback = args.fallback.unwrap_or(config.match_fallback);
    let endpoint = OllamaClient::new(&config.inference).map_err(AppError::from)?;
    info!(
        "Inference endpoint: {} (default model: {}, fallback: {})",
        endpoint.base_url(),
        config.models.default_model,
        fallback
    );

    let workflow = HiringWorkflow::new(store, &config.models, fallback);
    let run = workflow.run(input, &endpoint).await?;

    if args.json {
        let json = presenter::render_json(&run).context("Failed to serialize the run")?;
        println!("{json}");
    } else if args.show_steps {
        print!("{}", presenter::render_steps(&run));
    } else {
        print!("{}", presenter::render_final(&run));
    }

    Ok(())
}

async fn check_models(config: &Config) -> Result<()> {
    let client = OllamaClient::new(&config.inference).map_err(AppError::from)?;
    let available = client.list_models().await.map_err(AppError::from)?;
    info!("Daemon reports {} pulled models", available.len());

    print!(
        "{}",
        presenter::render_model_check(client.base_url(), &config.models, &available)
    );
    Ok(())
}
