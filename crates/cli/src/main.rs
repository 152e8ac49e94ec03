mod commands;
mod logging;

use clap::{Parser, Subcommand};
use commands::{GenerateArgs, ListArgs};
use logging::LoggingConfig;

#[derive(Parser)]
#[command(name = "connect-openapi")]
#[command(about = "Generate OpenAPI components for Connect RPC services from protobuf descriptor sets")]
struct Cli {
    /// Log level filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate OpenAPI documents for files of a descriptor set
    Generate(GenerateArgs),

    /// List the files, messages and services of a descriptor set
    List(ListArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(LoggingConfig {
        level: cli.log_level.clone(),
        json_format: cli.json_logs,
        ..Default::default()
    })?;

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args),
        Commands::List(args) => commands::list::run(args),
    }
}
