use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use orra_rs::apps::hello_world;
use orra_rs::config::OrraConfig;
use orra_rs::orra::{ConsolePrinter, Printer, State};
use orra_rs::orra::server;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a YAML config file (defaults to ./orra.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log state before and after every step
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile the application and serve its endpoints
    Serve {
        /// Host to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Compile the application and run the workflow once with an empty state
    Execute,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let mut config = OrraConfig::load(args.config.as_deref()).context("loading config")?;
    config.debug |= args.debug;

    let printer = ConsolePrinter;
    let mut app = hello_world::app()?;

    match args.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    }) {
        Commands::Serve { host, port } => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }

            app.compile_with(&printer, config.debug)?;
            printer.print("Starting Orra application... Done!");
            printer.print("");
            printer.print("Orra development server running!");
            printer.print(&format!("Your API is running at:     {}", config.base_url()));
            printer.print("");

            let shutdown = CancellationToken::new();
            let trigger = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        log::info!("Ctrl+C received, shutting down");
                        trigger.cancel();
                    }
                    Err(e) => log::error!("Failed to listen for Ctrl+C: {}", e),
                }
            });

            server::serve(&app, &config, shutdown).await?;
        }
        Commands::Execute => {
            let plan = app.compile_with(&printer, config.debug)?;
            println!("Running workflow: {}", plan.describe());

            let state = plan.invoke(State::new()).await?;
            println!("{}", serde_json::to_string_pretty(&state)?);
        }
    }

    Ok(())
}
