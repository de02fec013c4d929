use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fundry_node::seed::seed_demo_data;
use fundry_node::{router, AppState};

#[derive(Parser)]
#[command(name = "fundry-node", about = "Fundry double-entry ledger daemon")]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    bind: String,

    /// HTTP port to listen on.
    #[arg(long, default_value_t = 3040)]
    port: u16,

    /// Load the demo dataset (four wallets, two funding deals) on startup.
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let state = AppState::default();

    if cli.seed {
        let mut ledger = state.ledger.write().await;
        seed_demo_data(&mut ledger)?;
        info!("seeded demo dataset");
    }

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("fundry-node listening on {addr}");

    axum::serve(listener, router(state)).await?;
    Ok(())
}
