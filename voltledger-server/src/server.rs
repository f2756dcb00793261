// voltledger-server/src/server.rs

use std::net::SocketAddr;

use tokio::net::TcpListener;
use tracing::{error, info};

use voltledger_core::api::router;
use voltledger_core::Error;

use crate::context::ServerContext;
use crate::Args;

pub async fn run_server(args: Args) -> Result<(), Error> {
    let addr: SocketAddr = args
        .bind_addr
        .parse()
        .map_err(|e| Error::Parse(format!("Invalid bind address '{}': {}", args.bind_addr, e)))?;

    let ctx = ServerContext::new(&args).await?;
    let app = router(ctx.state.clone());

    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    // Ctrl-C => shut the event bus down; everything else follows it.
    let eb_for_ctrlc = ctx.event_bus.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {:?}", e);
        }
        info!("Ctrl-C detected; shutting down event bus...");
        eb_for_ctrlc.shutdown();
    });

    let mut shutdown_rx = ctx.event_bus.shutdown_rx.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow() {
                if shutdown_rx.changed().await.is_err() {
                    break;
                }
            }
        })
        .await?;

    ctx.event_bus.shutdown();
    ctx.join_background().await;
    info!("Server shutdown complete.");
    Ok(())
}
