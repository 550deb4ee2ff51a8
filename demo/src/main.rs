//! ATRiAN Trust & Ethics Runtime: Demo CLI
//!
//! Runs the scripted scenarios, or evaluates a single action or operation
//! against the bundled rules.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- ide-session
//!   cargo run -p demo -- evaluate "Collect personal data for ads" --domain marketing
//!   cargo run -p demo -- operation data_access --context '{"note":"private"}' --user alice

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atrian_contracts::{error::AtrianResult, ethics::EvaluationContext};

mod runtime;
mod scenarios;

use runtime::Runtime;
use scenarios::{ide_session, memory_privacy, trust_ledger};

// ── CLI definition ────────────────────────────────────────────────────────────

/// ATRiAN: ethical evaluation and trust tracking for agent operations.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "ATRiAN trust and ethics runtime demo",
    long_about = "Runs ATRiAN demo scenarios showing rule-based ethical evaluation,\n\
                  trust scoring, operation guidance, and privacy-aware memory."
)]
struct Cli {
    /// Rules YAML to load instead of the bundled rules.
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// Adapter TOML to load instead of the bundled config.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for file-backed state. Defaults to a temp directory.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three scenarios in sequence.
    RunAll,
    /// Scenario 1: operations from an editor session, with notifications.
    IdeSession,
    /// Scenario 2: baselines, events, decay, boundaries and delegation.
    TrustLedger,
    /// Scenario 3: privacy classification, anonymization and retention.
    MemoryPrivacy,
    /// Evaluate one action description together with an agent's trust.
    Evaluate {
        description: String,
        #[arg(long, default_value = "User")]
        agent: String,
        #[arg(long)]
        domain: Option<String>,
        #[arg(long)]
        purpose: Option<String>,
        #[arg(long = "data-source")]
        data_sources: Vec<String>,
    },
    /// Evaluate one operation through the adapter.
    Operation {
        operation_type: String,
        /// Operation context as JSON.
        #[arg(long, default_value = "{}")]
        context: String,
        #[arg(long, default_value = "User")]
        user: String,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> AtrianResult<()> {
    let runtime = Runtime::new(cli.rules.as_deref(), cli.config.as_deref())?;
    let state_dir = cli
        .state_dir
        .unwrap_or_else(|| std::env::temp_dir().join("atrian-demo"));

    match cli.command {
        Command::RunAll => {
            print_banner();
            ide_session::run_scenario(&runtime, &state_dir)?;
            trust_ledger::run_scenario(&runtime)?;
            memory_privacy::run_scenario(&state_dir)?;
            println!("All scenarios completed successfully.");
        }
        Command::IdeSession => {
            print_banner();
            ide_session::run_scenario(&runtime, &state_dir)?;
        }
        Command::TrustLedger => {
            print_banner();
            trust_ledger::run_scenario(&runtime)?;
        }
        Command::MemoryPrivacy => {
            print_banner();
            memory_privacy::run_scenario(&state_dir)?;
        }
        Command::Evaluate {
            description,
            agent,
            domain,
            purpose,
            data_sources,
        } => {
            let context = EvaluationContext {
                domain,
                purpose,
                data_sources,
                ..EvaluationContext::default()
            };
            let composite = runtime
                .adapter
                .integrator()
                .evaluate_action_with_trust(&agent, &description, &context);
            println!("{}", serde_json::to_string_pretty(&composite)?);
        }
        Command::Operation {
            operation_type,
            context,
            user,
        } => {
            let context: serde_json::Value = serde_json::from_str(&context)?;
            let evaluation = runtime
                .adapter
                .evaluate_operation(&operation_type, context, &user);
            println!("{}", serde_json::to_string_pretty(&evaluation)?);
            if let Some(notification) = runtime.adapter.generate_notification(&evaluation.operation_id)
            {
                println!("{}", serde_json::to_string_pretty(&notification)?);
            }
        }
    }
    Ok(())
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("ATRiAN: Trust & Ethics Runtime");
    println!("==============================");
    println!();
    println!("Pipeline per operation:");
    println!("  [1] Operation type mapped to a guidance context");
    println!("  [2] Context scanned for privacy keywords");
    println!("  [3] Ethical compass evaluates the action against built-in checks and rules");
    println!("  [4] Trust ledger score gates the decision (min trust to allow)");
    println!("  [5] Silent guide picks rule or fallback guidance");
    println!("  [6] Privacy events adjust trust; notification built on request");
    println!();
}
