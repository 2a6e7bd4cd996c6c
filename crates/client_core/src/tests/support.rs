use std::time::Duration;

use shared::protocol::ClientAction;
use tokio::sync::{mpsc, watch};

use crate::{
    channel::{ChannelEvent, ChannelHandle, ChannelState},
    config::ClientConfig,
    session::{SessionEvent, StorySession},
};

/// A session wired to an in-memory channel instead of a websocket.
pub(crate) struct Harness {
    pub(crate) session: StorySession,
    pub(crate) state: watch::Sender<ChannelState>,
    pub(crate) outbound: mpsc::UnboundedReceiver<ClientAction>,
    pub(crate) inbound: mpsc::UnboundedSender<ChannelEvent>,
}

impl Harness {
    pub(crate) fn new(state: ChannelState) -> Self {
        let (state_tx, state_rx) = watch::channel(state);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let config = ClientConfig {
            reveal_speed: Duration::from_millis(10),
            ..ClientConfig::default()
        };
        let session = StorySession::with_channel(
            config,
            ChannelHandle::new(state_rx, outbound_tx),
            inbound_rx,
            None,
        );
        Self {
            session,
            state: state_tx,
            outbound: outbound_rx,
            inbound: inbound_tx,
        }
    }

    /// An open channel with the session already past its `Opened` event.
    pub(crate) fn open() -> Self {
        let mut harness = Self::new(ChannelState::Open);
        harness
            .session
            .handle_channel_event(ChannelEvent::Opened);
        harness
    }

    pub(crate) fn frame(&mut self, raw: &str) {
        self.session.handle_channel_event(ChannelEvent::Frame(raw.to_string()));
    }

    /// Lets every running reveal finish and applies what they staged.
    pub(crate) async fn settle_reveals(&mut self) {
        while self.session.staged.is_some() {
            if !self.session.step().await {
                break;
            }
        }
    }

    pub(crate) fn sent(&mut self) -> Vec<ClientAction> {
        let mut sent = Vec::new();
        while let Ok(action) = self.outbound.try_recv() {
            sent.push(action);
        }
        sent
    }
}

pub(crate) fn drain(events: &mut tokio::sync::broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    seen
}

pub(crate) fn notices(events: &[SessionEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Notice(notice) => Some(notice.message.clone()),
            _ => None,
        })
        .collect()
}
