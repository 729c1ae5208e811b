use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use subgate::authorizer::{AllowAll, Authorizer, Event};
use subgate::broker::Broker;
use subgate::config::ServerSettings;
use subgate::transport::{self, AppState};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct DenyConnect;

#[async_trait]
impl Authorizer for DenyConnect {
    async fn decide(&self, _event: &Event) -> bool {
        false
    }
}

async fn start(authorizer: Arc<dyn Authorizer>) -> (SocketAddr, Arc<Broker>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let broker = Arc::new(Broker::default());
    let state = AppState::new(broker.clone(), authorizer, ServerSettings::default());

    tokio::spawn(transport::serve(listener, state, std::future::pending()));
    (addr, broker)
}

async fn connect(addr: SocketAddr, key: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/subscribe?key={key}"))
        .await
        .expect("websocket connect");
    ws
}

async fn subscribe(ws: &mut Client, topic: &str) {
    let frame = json!({"action": "subscribe", "value": topic}).to_string();
    ws.send(WsMessage::Text(frame.into())).await.unwrap();
}

async fn next_json(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(3), ws.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
            .expect("websocket error");
        if let WsMessage::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn wait_for_subscribers(broker: &Broker, topic: &str, count: usize) {
    for _ in 0..300 {
        if broker.subscribers_of(topic) == count {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("expected {count} subscribers on {topic}");
}

async fn publish(addr: SocketAddr, body: Value) -> (u16, Value) {
    let response = reqwest::Client::new()
        .post(format!("http://{addr}/publish"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

#[tokio::test]
async fn addressed_and_public_messages_reach_the_right_clients() {
    let (addr, broker) = start(Arc::new(AllowAll)).await;
    let mut alice = connect(addr, "alice").await;
    let mut bob = connect(addr, "bob").await;

    subscribe(&mut alice, "chat").await;
    subscribe(&mut bob, "chat").await;
    wait_for_subscribers(&broker, "chat", 2).await;

    let (status, body) = publish(
        addr,
        json!({"topic": "chat", "payload": "secret", "to": ["bob"]}),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);

    let to_bob = next_json(&mut bob).await;
    assert_eq!(to_bob["topic"], "chat");
    assert_eq!(to_bob["payload"], "secret");
    assert!(to_bob.get("to").is_none());

    publish(addr, json!({"topic": "chat", "payload": "everyone"})).await;

    // the addressed message never reached alice, so the public one is next
    let to_alice = next_json(&mut alice).await;
    assert_eq!(to_alice["payload"], "everyone");
    assert!(to_alice.get("to").is_none());
    assert_eq!(next_json(&mut bob).await["payload"], "everyone");
}

#[tokio::test]
async fn closing_a_client_detaches_it() {
    let (addr, broker) = start(Arc::new(AllowAll)).await;
    let mut ws = connect(addr, "").await;
    subscribe(&mut ws, "news").await;
    wait_for_subscribers(&broker, "news", 1).await;

    ws.close(None).await.unwrap();
    wait_for_subscribers(&broker, "news", 0).await;

    // topic membership and the subscriber go in the same detach
    assert_eq!(broker.subscriber_count(), 0);
    assert_eq!(broker.topic_count(), 0);
}

#[tokio::test]
async fn denied_connect_is_refused_before_upgrade() {
    let (addr, broker) = start(Arc::new(DenyConnect)).await;

    let err = connect_async(format!("ws://{addr}/subscribe?key=mallory"))
        .await
        .unwrap_err();
    match err {
        WsError::Http(response) => assert_eq!(response.status().as_u16(), 403),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(broker.subscriber_count(), 0);
}

#[tokio::test]
async fn malformed_publish_is_rejected() {
    let (addr, _broker) = start(Arc::new(AllowAll)).await;

    let response = reqwest::Client::new()
        .post(format!("http://{addr}/publish"))
        .header("content-type", "application/json")
        .body("{\"topic\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
}
