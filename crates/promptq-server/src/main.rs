mod config;
mod routes;

use std::sync::Arc;

use anyhow::{Context, Result};
use promptq_core::DispatcherBuilder;
use promptq_core::impls::{EchoProvider, InMemoryTaskStore, OpenAiProvider, RedisTaskStore};
use promptq_core::ports::{CompletionProvider, TaskRecordStore};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{ProviderConfig, ServerConfig, StoreConfig};

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(err) = dotenvy::dotenv()
        && !err.not_found()
    {
        return Err(err).context("failed to load .env");
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "promptq_server=info,promptq_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().context("invalid configuration")?;

    let store: Arc<dyn TaskRecordStore> = match &config.store {
        StoreConfig::Memory => {
            tracing::warn!("using in-memory task store; records are lost on restart");
            Arc::new(InMemoryTaskStore::new())
        }
        StoreConfig::Redis { url } => {
            let store = RedisTaskStore::connect(url)
                .await
                .context("failed to connect to Redis")?;
            tracing::info!("connected to Redis");
            Arc::new(store)
        }
    };

    let provider: Arc<dyn CompletionProvider> = match &config.provider {
        ProviderConfig::Echo => {
            tracing::info!("using echo completion provider");
            Arc::new(EchoProvider::new())
        }
        ProviderConfig::OpenAi {
            api_key,
            base_url,
            timeout,
        } => {
            let mut provider = OpenAiProvider::with_timeout(api_key.clone(), *timeout)
                .context("failed to build completion client")?;
            if let Some(base_url) = base_url {
                provider = provider.with_base_url(base_url.clone());
            }
            tracing::info!(model = %config.dispatch.completion.model, "using OpenAI completion provider");
            Arc::new(provider)
        }
    };

    let dispatcher = Arc::new(
        DispatcherBuilder::new(store, provider)
            .config(config.dispatch.clone())
            .start()
            .context("failed to start dispatcher")?,
    );

    let app = routes::router(Arc::clone(&dispatcher)).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let dropped = dispatcher.shutdown().await;
    tracing::info!(dropped, "shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
