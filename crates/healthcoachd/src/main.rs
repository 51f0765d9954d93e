use clap::{Parser, Subcommand};
use hc_api::rest::health::init_start_time;
use hc_api::{build_router, AppState};
use healthcoachd::{import_batch, load_config, render_config, DAEMON_VERSION, DEFAULT_LOG_FILTER};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "healthcoachd",
    version = DAEMON_VERSION,
    about = "Health coaching daemon"
)]
struct Cli {
    /// Config directory (defaults to ~/.healthcoach)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server in the foreground
    Run {
        /// Port to bind to (overrides config)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Validate and save the records in a JSON batch file
    Import {
        /// File containing `{ "records": [{ "record_type", "data" }] }`
        file: PathBuf,
    },
    /// Print the effective configuration
    Config,
    /// Print version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { port } => {
            let mut config = load_config(cli.config_dir)?;
            if let Some(port) = port {
                config.port = port;
                config.validate()?;
            }
            config.paths()?.ensure_config_dir()?;

            println!("Health coach daemon running...");
            println!();
            println!("  API:    http://{}", config.bind_addr());
            println!("  Models: {}", config.llm.models.join(" -> "));
            println!();

            init_start_time();

            let state = AppState::new(config.clone())?;
            let app = build_router(state);

            let addr: SocketAddr = config.bind_addr().parse()?;
            tracing::info!("Listening on {}", addr);

            let listener = tokio::net::TcpListener::bind(addr).await?;

            let shutdown = async {
                #[cfg(unix)]
                {
                    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                    {
                        Ok(mut terminate) => {
                            tokio::select! {
                                _ = tokio::signal::ctrl_c() => {}
                                _ = terminate.recv() => {}
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Failed to install SIGTERM handler: {}", e);
                            let _ = tokio::signal::ctrl_c().await;
                        }
                    }
                }
                #[cfg(not(unix))]
                {
                    let _ = tokio::signal::ctrl_c().await;
                }
                tracing::info!("Shutting down...");
            };

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown)
                .await?;

            Ok(())
        }

        Commands::Import { file } => {
            let config = load_config(cli.config_dir)?;
            let result = import_batch(&config, &file)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.failed > 0 {
                eprintln!("{}", result.summary());
            }
            Ok(())
        }

        Commands::Config => {
            let config = load_config(cli.config_dir)?;
            print!("{}", render_config(&config)?);
            Ok(())
        }

        Commands::Version => {
            println!("healthcoachd {}", DAEMON_VERSION);
            Ok(())
        }
    }
}
