//! Channel Manager: owns the story websocket and its reconnect loop.
//!
//! The connection itself lives inside a spawned task. Everything else talks to
//! it through a [`ChannelHandle`], which exposes the readiness state and a
//! send primitive that refuses work unless the channel is open.

use std::{fmt, time::Duration};

use futures::{SinkExt, StreamExt};
use shared::protocol::ClientAction;
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::SendError;

type StoryStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        })
    }
}

/// Lifecycle and inbound traffic reported by the channel task, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Opened,
    Frame(String),
    /// Transport fault. Always followed by `Closed`.
    Error(String),
    Closed,
}

#[derive(Debug, Clone)]
pub struct ChannelHandle {
    state: watch::Receiver<ChannelState>,
    outbound: mpsc::UnboundedSender<ClientAction>,
}

impl ChannelHandle {
    pub(crate) fn new(
        state: watch::Receiver<ChannelState>,
        outbound: mpsc::UnboundedSender<ClientAction>,
    ) -> Self {
        Self { state, outbound }
    }

    pub fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    pub fn send(&self, action: ClientAction) -> Result<(), SendError> {
        let state = self.state();
        if state != ChannelState::Open {
            return Err(SendError::NotOpen(state));
        }
        self.outbound.send(action).map_err(|_| SendError::Shutdown)
    }
}

enum PumpExit {
    Disconnected,
    Shutdown,
}

pub struct ChannelManager {
    endpoint: Url,
    reconnect_delay: Duration,
    state: watch::Sender<ChannelState>,
    events: mpsc::UnboundedSender<ChannelEvent>,
    outbound: mpsc::UnboundedReceiver<ClientAction>,
}

impl ChannelManager {
    /// Starts the connect/retry loop. The loop ends once every handle and the
    /// event receiver have been dropped, or when the returned task is aborted.
    pub fn spawn(
        endpoint: Url,
        reconnect_delay: Duration,
    ) -> (
        ChannelHandle,
        mpsc::UnboundedReceiver<ChannelEvent>,
        JoinHandle<()>,
    ) {
        let (state_tx, state_rx) = watch::channel(ChannelState::Closed);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

        let manager = Self {
            endpoint,
            reconnect_delay,
            state: state_tx,
            events: events_tx,
            outbound: outbound_rx,
        };
        let task = tokio::spawn(manager.run());

        (ChannelHandle::new(state_rx, outbound_tx), events_rx, task)
    }

    async fn run(mut self) {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            self.state.send_replace(ChannelState::Connecting);
            // A send that saw `Open` just before the close may land after the drain below.
            self.discard_unsent();
            info!(endpoint = %self.endpoint, attempt, "channel: connecting");

            match connect_async(self.endpoint.as_str()).await {
                Ok((stream, _)) => {
                    info!(endpoint = %self.endpoint, "channel: open");
                    self.state.send_replace(ChannelState::Open);
                    if !self.emit(ChannelEvent::Opened) {
                        return;
                    }
                    if let PumpExit::Shutdown = self.pump(stream).await {
                        self.state.send_replace(ChannelState::Closed);
                        return;
                    }
                }
                Err(err) => {
                    warn!(endpoint = %self.endpoint, error = %err, "channel: connect failed");
                    if !self.emit(ChannelEvent::Error(err.to_string())) {
                        return;
                    }
                }
            }

            self.state.send_replace(ChannelState::Closed);
            self.discard_unsent();
            if !self.emit(ChannelEvent::Closed) {
                return;
            }

            info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "channel: closed, reconnecting after backoff"
            );
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    async fn pump(&mut self, stream: StoryStream) -> PumpExit {
        let (mut writer, mut reader) = stream.split();
        loop {
            tokio::select! {
                frame = reader.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        if !self.emit(ChannelEvent::Frame(text)) {
                            return PumpExit::Shutdown;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!(?frame, "channel: closed by server");
                        return PumpExit::Disconnected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "channel: receive failed");
                        if !self.emit(ChannelEvent::Error(err.to_string())) {
                            return PumpExit::Shutdown;
                        }
                        return PumpExit::Disconnected;
                    }
                    None => return PumpExit::Disconnected,
                },
                action = self.outbound.recv() => {
                    let Some(action) = action else {
                        return PumpExit::Shutdown;
                    };
                    let text = match action.encode() {
                        Ok(text) => text,
                        Err(err) => {
                            error!(action = action.name(), error = %err, "channel: failed to encode action");
                            continue;
                        }
                    };
                    if let Err(err) = writer.send(Message::Text(text)).await {
                        warn!(action = action.name(), error = %err, "channel: send failed");
                        if !self.emit(ChannelEvent::Error(err.to_string())) {
                            return PumpExit::Shutdown;
                        }
                        return PumpExit::Disconnected;
                    }
                    debug!(action = action.name(), "channel: action sent");
                }
            }
        }
    }

    /// Drops actions accepted just before the connection went away.
    fn discard_unsent(&mut self) {
        while let Ok(action) = self.outbound.try_recv() {
            warn!(
                action = action.name(),
                "channel: discarding action queued before close"
            );
        }
    }

    fn emit(&self, event: ChannelEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
