use chat_assistant::conversation::{ ControllerConfig, ConversationController };
use chat_assistant::engine::rules::{ GREETING_REPLY, THANKS_REPLY };
use chat_assistant::engine::ResponseDispatcher;
use chat_assistant::history::{ HistoryStore, MemoryHistoryStore };
use chat_assistant::models::chat::Sender;
use chat_assistant::remote::{ HttpRemoteResponder, RemoteError, RemoteResponder };
use chat_assistant::server::api::{ cors_layer, router, AppState, DelayRange };
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(AppState::new(ResponseDispatcher::default(), 0, DelayRange::NONE), cors_layer(""));
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    addr
}

async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

fn client(addr: SocketAddr) -> HttpRemoteResponder {
    HttpRemoteResponder::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn client_talks_to_live_server() {
    let remote = client(spawn_server().await);

    let health = remote.health().await.unwrap();
    assert_eq!(health.status, "ok");

    let reply = remote.respond("Hello").await.unwrap();
    assert_eq!(reply.text, GREETING_REPLY);
    assert!(reply.timestamp.is_some());
}

#[tokio::test]
async fn whitespace_message_is_rejected_by_server() {
    let remote = client(spawn_server().await);
    match remote.respond("   ").await {
        Err(RemoteError::Rejected { status, message }) => {
            assert_eq!(status, 400);
            assert_eq!(message, "Message cannot be empty");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn closed_port_is_a_transport_failure() {
    let remote = client(unused_addr().await);
    let err = remote.respond("Hello").await.unwrap_err();
    assert!(err.is_transport(), "unexpected error {:?}", err);
}

#[tokio::test]
async fn controller_edits_through_the_remote_service() {
    let history = Arc::new(MemoryHistoryStore::default());
    let remote: Arc<dyn RemoteResponder> = Arc::new(client(spawn_server().await));
    let mut controller = ConversationController::open(
        ControllerConfig {
            session_id: "it".into(),
            thinking_floor: Duration::ZERO,
            failure_pause: Duration::ZERO,
        },
        ResponseDispatcher::default(),
        Some(remote),
        history.clone()
    ).await;

    controller.submit("hello there").await.unwrap();
    let reply = controller.edit_last_user_message("thank you").await.unwrap();
    assert_eq!(reply.text, THANKS_REPLY);

    let senders: Vec<Sender> = controller.messages().iter().map(|m| m.sender).collect();
    assert_eq!(senders, vec![Sender::Assistant, Sender::User, Sender::Assistant]);
    assert!(history.load("it").await.unwrap().unwrap().contains("thank you"));
}

#[tokio::test]
async fn controller_falls_back_when_service_is_down() {
    let remote: Arc<dyn RemoteResponder> = Arc::new(client(unused_addr().await));
    let mut controller = ConversationController::open(
        ControllerConfig {
            session_id: "down".into(),
            thinking_floor: Duration::ZERO,
            failure_pause: Duration::ZERO,
        },
        ResponseDispatcher::default(),
        Some(remote),
        Arc::new(MemoryHistoryStore::default())
    ).await;

    let reply = controller.submit("hey").await.unwrap();
    assert_eq!(reply.text, GREETING_REPLY);
}
