mod commands;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "epsagon-weld",
    version,
    about = "Wrap serverless function handlers with the Epsagon tracer"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Service directory (default: current directory)
    #[arg(short = 'C', long, default_value = ".", global = true)]
    service_dir: PathBuf,

    /// Service descriptor, relative to the service directory
    #[arg(long, default_value = "serverless.yml", global = true)]
    config: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate wrappers and reassign handlers
    Run {
        /// Write the patched descriptor here instead of printing the handler table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove the generated handlers directory
    Clean,
    /// Dispatch a host lifecycle event (e.g. "before:package:createDeploymentArtifacts")
    Hook {
        event: String,
        /// Write the patched descriptor here instead of printing the handler table
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the lifecycle events the plugin is attached to
    Hooks,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let service = commands::ServiceArgs::new(cli.service_dir, cli.config);
    match cli.command {
        Commands::Run { output } => commands::run::execute(&service, output.as_deref()).await,
        Commands::Clean => commands::clean::execute(&service).await,
        Commands::Hook { event, output } => {
            commands::hook::execute(&service, &event, output.as_deref()).await
        }
        Commands::Hooks => {
            commands::hook::list();
            Ok(())
        }
    }
}
