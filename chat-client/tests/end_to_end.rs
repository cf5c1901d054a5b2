//! Client against a real server on a random port

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chat_client::{
    CacheEvent, CacheStore, ChatClient, ClientConfig, ClientError, InMemoryCache, SharedCache,
    SubscriptionClient, SyncOutcome,
};
use tokio::net::TcpListener;
use tokio::time::{sleep, timeout};

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = chat_server::router(Arc::new(chat_server::ServerState::new()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

fn config(addr: SocketAddr) -> ClientConfig {
    ClientConfig::new(&format!("http://{}", addr))
        .unwrap()
        .with_reconnect_delay(Duration::from_millis(100))
}

fn order(client: &ChatClient) -> Vec<String> {
    client.with_store(|store| {
        store
            .chat_list()
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.id)
            .collect()
    })
}

async fn wait_connected(subscriptions: &SubscriptionClient) {
    timeout(Duration::from_secs(5), async {
        while !subscriptions.is_connected().await {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Subscription client never connected");
    // Let the server attach the subscription streams
    sleep(Duration::from_millis(200)).await;
}

#[tokio::test]
async fn test_fetch_fills_the_cache() {
    let addr = start_server().await;
    let client = ChatClient::new(&config(addr), InMemoryCache::new()).unwrap();

    let chats = client.fetch_chats().await.unwrap();
    assert_eq!(chats.len(), 4);
    assert_eq!(order(&client), vec!["1", "2", "3", "4"]);
    assert_eq!(
        chats[0].last_message.as_ref().unwrap().content,
        "You on your way?"
    );

    let chat = client.fetch_chat("2").await.unwrap().unwrap();
    assert_eq!(chat.name, "Bryan Wallace");
    assert_eq!(chat.messages.messages.len(), 1);
    assert!(client.with_store(|s| s.full_chat("2")).is_some());

    assert!(client.fetch_chat("404").await.unwrap().is_none());
    assert!(client.with_store(|s| s.full_chat("404")).is_none());

    let users = client.fetch_users().await.unwrap();
    assert_eq!(users.len(), 5);
}

#[tokio::test]
async fn test_add_message_promotes_chat() {
    let addr = start_server().await;
    let client = ChatClient::new(&config(addr), InMemoryCache::new()).unwrap();
    client.fetch_chats().await.unwrap();
    client.fetch_chat("3").await.unwrap();

    let sent = client
        .add_message("3", "Sounds good")
        .await
        .unwrap()
        .expect("Chat 3 exists");

    assert_eq!(order(&client), vec!["3", "1", "2", "4"]);
    let chat = client.with_store(|s| s.full_chat("3")).unwrap();
    assert_eq!(chat.last_message.as_ref().map(|m| m.id.as_str()), Some(sent.id.as_str()));
    // Only the confirmed message remains, the optimistic copy is gone
    assert_eq!(chat.messages.messages.len(), 2);
    assert!(chat.messages.messages.iter().all(|m| !m.id.starts_with("optimistic-")));
}

#[tokio::test]
async fn test_rejected_message_rolls_back() {
    let addr = start_server().await;
    let client = ChatClient::new(&config(addr), InMemoryCache::new()).unwrap();
    client.fetch_chats().await.unwrap();
    let before = client.with_store(|s| s.clone());

    assert!(client.add_message("404", "hello?").await.unwrap().is_none());
    assert_eq!(client.with_store(|s| s.clone()), before);

    assert!(matches!(
        client.add_message("1", "   ").await,
        Err(ClientError::Validation(_))
    ));
}

#[tokio::test]
async fn test_add_and_remove_chat() {
    let addr = start_server().await;
    let client = ChatClient::new(&config(addr), InMemoryCache::new()).unwrap();
    client.fetch_chats().await.unwrap();

    let ray = client
        .fetch_users()
        .await
        .unwrap()
        .into_iter()
        .find(|u| u.name == "Ray Edwards")
        .unwrap();

    let chat = client.add_chat(&ray).await.unwrap().unwrap();
    assert_eq!(order(&client), vec![chat.id.as_str(), "1", "2", "3", "4"]);

    let removed = client.remove_chat(&chat.id).await.unwrap();
    assert_eq!(removed.as_deref(), Some(chat.id.as_str()));
    assert_eq!(order(&client), vec!["1", "2", "3", "4"]);

    assert_eq!(client.remove_chat(&chat.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_subscription_applies_pushes_from_another_client() {
    let addr = start_server().await;
    let config = config(addr);

    let cache: SharedCache<InMemoryCache> = Arc::new(Mutex::new(InMemoryCache::new()));
    let watcher = ChatClient::with_cache(&config, cache.clone()).unwrap();
    watcher.fetch_chats().await.unwrap();
    watcher.fetch_chat("4").await.unwrap();

    let subscriptions = SubscriptionClient::new(&config, cache.clone()).unwrap();
    let mut updates = subscriptions.updates();
    subscriptions.connect();
    wait_connected(&subscriptions).await;

    let sender = ChatClient::new(&config, InMemoryCache::new()).unwrap();
    let sent = sender.add_message("4", "ice cream?").await.unwrap().unwrap();

    let applied = timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("Timeout waiting for push")
        .unwrap();
    assert_eq!(applied.outcome, SyncOutcome::Applied);
    match applied.event {
        CacheEvent::MessageAdded(message) => assert_eq!(message.id, sent.id),
        other => panic!("Expected MessageAdded, got {:?}", other),
    }
    assert_eq!(order(&watcher), vec!["4", "1", "2", "3"]);

    sender.remove_chat("2").await.unwrap();
    let applied = timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("Timeout waiting for push")
        .unwrap();
    assert_eq!(applied.event, CacheEvent::ChatRemoved("2".to_string()));
    assert_eq!(order(&watcher), vec!["4", "1", "3"]);

    subscriptions.disconnect();
}

#[tokio::test]
async fn test_own_mutation_and_its_push_apply_once() {
    let addr = start_server().await;
    let config = config(addr);

    let cache: SharedCache<InMemoryCache> = Arc::new(Mutex::new(InMemoryCache::new()));
    let client = ChatClient::with_cache(&config, cache.clone()).unwrap();
    client.fetch_chats().await.unwrap();
    client.fetch_chat("1").await.unwrap();

    let subscriptions = SubscriptionClient::new(&config, cache.clone()).unwrap();
    let mut updates = subscriptions.updates();
    subscriptions.connect();
    wait_connected(&subscriptions).await;

    let sent = client.add_message("1", "on my way").await.unwrap().unwrap();

    let applied = timeout(Duration::from_secs(5), updates.recv())
        .await
        .expect("Timeout waiting for push")
        .unwrap();
    assert_eq!(applied.event, CacheEvent::MessageAdded(sent.clone()));
    // Whichever of the mutation result and the push lands second is a no-op
    let chat = client.with_store(|s| s.full_chat("1")).unwrap();
    let copies = chat.messages.messages.iter().filter(|m| m.id == sent.id).count();
    assert_eq!(copies, 1);

    subscriptions.disconnect();
}
