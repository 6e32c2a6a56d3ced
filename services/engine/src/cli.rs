use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use propsync::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "PropSync Engine",
    about = "Run the property synchronization and pricing orchestration engine",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the engine with its operational HTTP endpoints (default command)
    Serve(ServeArgs),
    /// Run an end-to-end in-process demo of reconciliation and pricing
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the operational HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the operational HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}
