use std::sync::{Arc, Mutex, PoisonError};

use chat_client::{
    CacheStore, ChatClient, ClientConfig, InMemoryCache, Result, SharedCache, SubscriptionClient,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn chat_order(cache: &SharedCache<InMemoryCache>) -> Vec<String> {
    let store = cache.lock().unwrap_or_else(PoisonError::into_inner);
    store
        .chat_list()
        .unwrap_or_default()
        .into_iter()
        .map(|chat| chat.name)
        .collect()
}

async fn run() -> Result<()> {
    let config = ClientConfig::from_env()?;
    let cache: SharedCache<InMemoryCache> = Arc::new(Mutex::new(InMemoryCache::new()));

    let client = ChatClient::with_cache(&config, cache.clone())?;
    let chats = client.fetch_chats().await?;
    for chat in &chats {
        client.fetch_chat(&chat.id).await?;
    }
    info!(chats = ?chat_order(&cache), "Chat list loaded");

    let subscriptions = SubscriptionClient::new(&config, cache.clone())?;
    let mut updates = subscriptions.updates();
    subscriptions.connect();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                subscriptions.disconnect();
                break;
            }
            update = updates.recv() => match update {
                Ok(applied) => info!(
                    event = applied.event.name(),
                    outcome = ?applied.outcome,
                    chats = ?chat_order(&cache),
                    "Cache updated"
                ),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Missed cache updates"),
                Err(RecvError::Closed) => break,
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("Chat client error: {}", e);
        std::process::exit(1);
    }
}
