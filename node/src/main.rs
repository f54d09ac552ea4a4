// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use provena_node::capture::SharedQueue;
use provena_node::config::NodeConfig;
use provena_node::ledger::{HttpLedger, Ledger};
use provena_node::server::{build_router, AppState};
use provena_node::sync::spawn_connectivity_listener;
use provena_node::telemetry;
use provena_node::verifier::VerifyConfig;
use provena_persistence::PendingQueue;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

#[tokio::main]
async fn main() {
    telemetry::init_telemetry();

    let cfg = NodeConfig::from_env();
    tracing::info!("Initializing provena node with config: {:?}", cfg);

    let queue: SharedQueue = match &cfg.queue_path {
        Some(path) => match PendingQueue::open(path) {
            Ok(q) => {
                if let Some(dropped) = q.truncated_bytes() {
                    tracing::warn!("pending queue recovered; dropped {} torn bytes", dropped);
                }
                metrics::gauge!("provena_queue_depth", q.len() as f64);
                tracing::info!("pending queue open at {:?} ({} entries)", path, q.len());
                Arc::new(Mutex::new(Some(q)))
            }
            Err(e) => {
                tracing::error!(
                    "pending queue unavailable ({}); running without offline durability",
                    e
                );
                Arc::new(Mutex::new(None))
            }
        },
        None => {
            tracing::warn!("no queue path configured; running without offline durability");
            Arc::new(Mutex::new(None))
        }
    };

    let ledger: Arc<dyn Ledger> = Arc::new(HttpLedger::new(cfg.ledger_url.clone()));
    let state = AppState::new(
        ledger,
        queue,
        VerifyConfig {
            window_size: cfg.window_size,
            thresholds: Default::default(),
        },
    );

    // Drain anything left over from a previous run.
    let startup_sync = state.coordinator.clone();
    tokio::spawn(async move {
        startup_sync.run_once().await;
    });

    spawn_connectivity_listener(state.coordinator.clone(), state.connectivity.subscribe());

    let app = build_router(state, cfg.auth_token.clone());

    let addr = cfg.bind_addr;
    tracing::info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
