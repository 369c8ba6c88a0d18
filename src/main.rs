use anyhow::Result;
use clap::Parser;
use meeting_archive::cli::{
    handle_chunk_command, handle_documents_command, handle_name_command, handle_process_command,
    handle_run_command, Cli, CliCommand,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Some(CliCommand::Version) => {
            println!("meeting-archive {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Name(args)) => {
            handle_name_command(args);
            Ok(())
        }
        Some(CliCommand::Process(args)) => handle_process_command(&cli, args).await,
        Some(CliCommand::Chunk) => handle_chunk_command(&cli),
        Some(CliCommand::Documents) => handle_documents_command(&cli).await,
        Some(CliCommand::Run) | None => handle_run_command(&cli).await,
    }
}
