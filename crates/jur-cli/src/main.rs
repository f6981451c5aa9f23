//! # jur CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Jurisdiction attribute registry CLI.
///
/// Administers a file-backed registry: validators, attribute types,
/// approvals, attribute issuance and revocation, and delegated queries.
#[derive(Parser, Debug)]
#[command(name = "jur", version, about)]
struct Cli {
    /// Registry state file.
    #[arg(long, global = true, default_value = "jurisdiction.json")]
    state: PathBuf,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Registry lifecycle and ownership.
    Registry(jur_cli::registry::RegistryArgs),
    /// Validator registration and signing keys.
    Validator(jur_cli::validator::ValidatorArgs),
    /// Attribute type definitions, pricing, and sources.
    AttributeType(jur_cli::attribute_type::AttributeTypeArgs),
    /// Approval grants and envelope invalidation.
    Approval(jur_cli::approval::ApprovalArgs),
    /// Attribute issuance, revocation, and queries.
    Attribute(jur_cli::attribute::AttributeArgs),
    /// Signing key files.
    Key(jur_cli::keys::KeyArgs),
    /// Sign an approval envelope off-line.
    ApprovalSign(jur_cli::signing::SignApprovalArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Registry(args) => jur_cli::registry::run(&cli.state, args),
        Commands::Validator(args) => jur_cli::validator::run(&cli.state, args),
        Commands::AttributeType(args) => jur_cli::attribute_type::run(&cli.state, args),
        Commands::Approval(args) => jur_cli::approval::run(&cli.state, args),
        Commands::Attribute(args) => jur_cli::attribute::run(&cli.state, args),
        Commands::Key(args) => jur_cli::keys::run(args),
        Commands::ApprovalSign(args) => jur_cli::signing::run(args),
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` counts map to levels.
fn init_tracing(verbosity: u8) {
    let fallback = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
