//! voltledger-server/src/context.rs
//!
//! Builds everything the HTTP server needs and owns the background tasks.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use voltledger_ai::{OpenAiChatBackend, ProviderConfig};
use voltledger_common::traits::{ChatBackend, PaymentGateway, PushSender};
use voltledger_core::api::{AppState, Collaborators};
use voltledger_core::config::AppConfig;
use voltledger_core::db::Database;
use voltledger_core::eventbus::EventBus;
use voltledger_core::payments::PaystackGateway;
use voltledger_core::push::{HttpPushSender, LogPushSender};
use voltledger_core::repositories::Repositories;
use voltledger_core::tasks::{
    spawn_denylist_sweep, spawn_notification_dispatcher, spawn_rate_limit_sweep,
    NotificationDispatcher,
};
use voltledger_core::Error;

use crate::Args;

const DISPATCH_BUFFER: usize = 1024;
const SWEEP_PERIOD: Duration = Duration::from_secs(60);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ServerContext {
    pub state: AppState,
    pub event_bus: Arc<EventBus>,
    background: Vec<JoinHandle<()>>,
}

impl ServerContext {
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let config = args.to_config()?;

        let (repos, database) = if args.in_memory {
            warn!("Running with the in-memory store; nothing will be persisted.");
            (Repositories::in_memory(), None)
        } else {
            info!("Connecting to Postgres");
            let db = Database::new(&args.database_url, args.db_max_connections).await?;
            db.migrate().await?;
            (Repositories::postgres(&db), Some(db))
        };

        let event_bus = Arc::new(EventBus::new());
        let collaborators = Collaborators {
            payment_gateway: payment_gateway(&config)?,
            chat_backend: chat_backend(&config)?,
            database,
        };
        let push = push_sender(&config)?;

        let state = AppState::new(config, &repos, event_bus.clone(), collaborators);

        let dispatcher = NotificationDispatcher::new(repos.users.clone(), repos.notifications.clone(), push);
        let background = vec![
            spawn_notification_dispatcher(&event_bus, dispatcher, DISPATCH_BUFFER).await,
            spawn_denylist_sweep(state.jwt.denylist(), SWEEP_PERIOD, event_bus.shutdown_rx.clone()),
            spawn_rate_limit_sweep(state.limiter.clone(), SWEEP_PERIOD, event_bus.shutdown_rx.clone()),
        ];

        Ok(Self { state, event_bus, background })
    }

    /// Waits for background tasks to finish after the bus has shut down.
    pub async fn join_background(self) {
        for handle in self.background {
            match tokio::time::timeout(DRAIN_TIMEOUT, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Background task panicked: {:?}", e),
                Err(_) => warn!("Background task did not stop within {:?}", DRAIN_TIMEOUT),
            }
        }
    }
}

fn payment_gateway(config: &AppConfig) -> Result<Option<Arc<dyn PaymentGateway>>, Error> {
    match &config.paystack {
        Some(p) => Ok(Some(Arc::new(PaystackGateway::new(p.clone())?))),
        None => {
            warn!("PAYSTACK_SECRET_KEY not set; purchases are disabled.");
            Ok(None)
        }
    }
}

fn chat_backend(config: &AppConfig) -> Result<Option<Arc<dyn ChatBackend>>, Error> {
    let Some(ai) = &config.ai else {
        warn!("OPENAI_API_KEY not set; the chatbot is disabled.");
        return Ok(None);
    };
    let provider = ProviderConfig {
        api_base: ai.api_base.clone(),
        model: ai.model.clone(),
        ..ProviderConfig::new(ai.api_key.clone())
    };
    Ok(Some(Arc::new(OpenAiChatBackend::new(provider)?)))
}

fn push_sender(config: &AppConfig) -> Result<Arc<dyn PushSender>, Error> {
    Ok(match &config.push {
        Some(p) => Arc::new(HttpPushSender::new(p.clone())?),
        None => {
            info!("No push endpoint configured; pushes will only be logged.");
            Arc::new(LogPushSender)
        }
    })
}
