use super::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::get,
    Router,
};
use tokio::net::TcpListener;

#[derive(Clone)]
struct ServerState {
    connections: Arc<AtomicUsize>,
    received: mpsc::UnboundedSender<String>,
    drop_first_connection: bool,
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve_socket(state, socket))
}

async fn serve_socket(state: ServerState, mut socket: WebSocket) {
    let connection = state.connections.fetch_add(1, Ordering::SeqCst) + 1;
    if state.drop_first_connection && connection == 1 {
        let _ = socket.send(WsMessage::Close(None)).await;
        return;
    }

    let _ = socket
        .send(WsMessage::Text(format!(r#"{{"type":"hello","connection":{connection}}}"#)))
        .await;
    while let Some(Ok(message)) = socket.recv().await {
        if let WsMessage::Text(text) = message {
            let _ = state.received.send(text);
        }
    }
}

async fn spawn_story_server(
    drop_first_connection: bool,
) -> Result<(Url, Arc<AtomicUsize>, mpsc::UnboundedReceiver<String>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let connections = Arc::new(AtomicUsize::new(0));
    let (received_tx, received_rx) = mpsc::unbounded_channel();
    let state = ServerState {
        connections: Arc::clone(&connections),
        received: received_tx,
        drop_first_connection,
    };
    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((Url::parse(&format!("ws://{addr}/ws"))?, connections, received_rx))
}

async fn next_event(events: &mut mpsc::UnboundedReceiver<ChannelEvent>) -> ChannelEvent {
    tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("channel event in time")
        .expect("channel task alive")
}

#[tokio::test]
async fn opens_receives_frames_and_sends_actions() {
    let (endpoint, _connections, mut received) = spawn_story_server(false).await.expect("server");
    let (handle, mut events, task) = ChannelManager::spawn(endpoint, Duration::from_millis(50));

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened);
    assert!(handle.is_open());
    assert_eq!(
        next_event(&mut events).await,
        ChannelEvent::Frame(r#"{"type":"hello","connection":1}"#.into())
    );

    handle.send(ClientAction::StartStory).expect("send");
    let frame = tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("frame in time")
        .expect("frame");
    assert_eq!(frame, r#"{"action":"start_story"}"#);

    task.abort();
}

#[tokio::test]
async fn reconnects_after_server_close() {
    let (endpoint, connections, mut received) = spawn_story_server(true).await.expect("server");
    let (handle, mut events, task) = ChannelManager::spawn(endpoint, Duration::from_millis(200));

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened);
    assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
    assert_ne!(handle.state(), ChannelState::Open);
    assert!(matches!(
        handle.send(ClientAction::next()),
        Err(SendError::NotOpen(_))
    ));

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened);
    assert_eq!(connections.load(Ordering::SeqCst), 2);

    handle.send(ClientAction::choose("Run")).expect("send after reconnect");
    let frame = tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("frame in time")
        .expect("frame");
    assert_eq!(frame, r#"{"action":"next","selected_choice":"Run"}"#);

    task.abort();
}

#[tokio::test]
async fn actions_queued_while_not_open_never_reach_the_next_connection() {
    let (endpoint, _connections, mut received) = spawn_story_server(false).await.expect("server");
    let (state_tx, state_rx) = watch::channel(ChannelState::Closed);
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    outbound_tx
        .send(ClientAction::choose("stale"))
        .expect("queue stale action");

    let manager = ChannelManager {
        endpoint,
        reconnect_delay: Duration::from_millis(50),
        state: state_tx,
        events: events_tx,
        outbound: outbound_rx,
    };
    let task = tokio::spawn(manager.run());
    let handle = ChannelHandle::new(state_rx, outbound_tx);

    assert_eq!(next_event(&mut events).await, ChannelEvent::Opened);
    handle.send(ClientAction::StartStory).expect("send");
    let frame = tokio::time::timeout(Duration::from_secs(5), received.recv())
        .await
        .expect("frame in time")
        .expect("frame");
    assert_eq!(frame, r#"{"action":"start_story"}"#);

    task.abort();
}

#[tokio::test]
async fn connect_failures_are_retried_indefinitely() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    let endpoint = Url::parse(&format!("ws://{addr}/ws")).expect("url");
    let (handle, mut events, task) = ChannelManager::spawn(endpoint, Duration::from_millis(20));

    for _ in 0..3 {
        assert!(matches!(next_event(&mut events).await, ChannelEvent::Error(_)));
        assert_eq!(next_event(&mut events).await, ChannelEvent::Closed);
    }
    assert!(matches!(
        handle.send(ClientAction::StartStory),
        Err(SendError::NotOpen(_))
    ));

    task.abort();
}

#[test]
fn handle_refuses_sends_unless_open() {
    let (state_tx, state_rx) = watch::channel(ChannelState::Connecting);
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    let handle = ChannelHandle::new(state_rx, outbound_tx);

    assert_eq!(
        handle.send(ClientAction::StartStory),
        Err(SendError::NotOpen(ChannelState::Connecting))
    );
    state_tx.send_replace(ChannelState::Open);
    assert_eq!(handle.send(ClientAction::StartStory), Ok(()));
    assert_eq!(outbound_rx.try_recv().ok(), Some(ClientAction::StartStory));

    drop(outbound_rx);
    assert_eq!(handle.send(ClientAction::next()), Err(SendError::Shutdown));
}
