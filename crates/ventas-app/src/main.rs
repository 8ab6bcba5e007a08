//! Ventas application binary - composition root.
//!
//! Ties the workspace crates into a single interactive executable:
//! 1. Parse CLI args and load configuration from TOML
//! 2. Initialize the SQLite history store
//! 3. Wire the flow controller to the stub backends
//! 4. Reconcile the active flow from persisted history
//! 5. Run a line-based chat loop on stdin

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use ventas_backend::stub::{StubAnswering, StubComparison, StubOrder};
use ventas_core::config::VentasConfig;
use ventas_flow::FlowController;
use ventas_storage::Database;

mod cli;

use cli::CliArgs;

/// Expand ~ to home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config first; the log level may come from it.
    let config_file = args.resolve_config_path();
    let config = VentasConfig::load_or_default(&config_file);

    // Tracing.
    let log_level = args
        .resolve_log_level()
        .unwrap_or_else(|| config.general.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    tracing::info!("Starting Ventas v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Storage.
    let data_dir = resolve_data_dir(
        &args
            .resolve_data_dir()
            .unwrap_or_else(|| config.general.data_dir.clone()),
    );
    let db_path = data_dir.join("ventas.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite history store opened");

    // Flow controller wired to the deterministic stub backends.
    let mut controller = FlowController::new(
        config,
        db,
        Arc::new(StubAnswering),
        Arc::new(StubComparison::new()),
        Arc::new(StubOrder::new()),
    );

    if args.fresh {
        controller.reset_session()?;
        tracing::info!("Session reset requested via --fresh");
    }

    // Render the persisted history verbatim, then reconcile the active flow
    // from it before accepting any input.
    for message in controller.history()? {
        let prefix = match message.role {
            ventas_core::types::Role::User => ">",
            ventas_core::types::Role::Agent => " ",
            ventas_core::types::Role::System => "#",
        };
        println!("{} {}", prefix, message.text);
    }
    controller.reconcile()?;
    if controller.comparison_state().active {
        println!("(retomando una conversación de compra en curso)");
    }

    println!("Ventas — asistente de ventas. Escribe tu mensaje, o:");
    println!("  /carrito   ver el carrito");
    println!("  /reiniciar borrar la conversación");
    println!("  /salir     terminar");

    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let line = line.trim();

        match line {
            "" => continue,
            "/salir" => break,
            "/reiniciar" => {
                controller.reset_session()?;
                println!("Conversación reiniciada.");
                continue;
            }
            "/carrito" => {
                let cart = controller.cart();
                if cart.is_empty() {
                    println!("El carrito está vacío.");
                } else {
                    for item in cart.items() {
                        println!(
                            "  {} × {} — ${}",
                            item.quantity,
                            item.product_name,
                            item.subtotal().round_dp(2)
                        );
                    }
                    println!("  Total: ${}", cart.total().round_dp(2));
                }
                continue;
            }
            _ => {}
        }

        match controller.handle_message(line).await {
            Ok(reply) => println!("{}", reply.message),
            Err(e) => {
                tracing::warn!(error = %e, "Turn failed");
                println!("(no pude procesar eso: {})", e);
            }
        }
    }

    Ok(())
}
