//! The session context: one owned value holding the channel handle, the view
//! state and the reveal engine, driven by a single event loop.

use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    channel::{ChannelEvent, ChannelHandle, ChannelManager, ChannelState},
    config::ClientConfig,
    error::ConfigError,
    input::UserAction,
    reveal::{RevealEngine, RevealOutcome, RevealSettled, RevealTicket, TextSurface},
    view::{Affordance, ContextPanel, Controls, LogEntry, LogKind, Notice, StoryView},
};

pub const CONNECTION_ERROR_NOTICE: &str = "Connection error";

/// Changes published to front ends, in the order they were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    ChannelStateChanged(ChannelState),
    ControlsChanged(Controls),
    CharacterChanged(Option<String>),
    LogCleared,
    LogAppended(LogEntry),
    AffordanceChanged(Affordance),
    ContextChanged(ContextPanel),
    Notice(Notice),
}

/// Affordance decided by a scene event, shown once that event's reveal completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct StagedAffordance {
    pub(crate) ticket: RevealTicket,
    pub(crate) affordance: Affordance,
}

pub struct StorySession {
    pub(crate) config: ClientConfig,
    pub(crate) channel: ChannelHandle,
    channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
    channel_task: Option<JoinHandle<()>>,
    pub(crate) view: StoryView,
    pub(crate) reveal: RevealEngine,
    pub(crate) dialog: TextSurface,
    settled: mpsc::UnboundedReceiver<RevealSettled>,
    pub(crate) staged: Option<StagedAffordance>,
    events: broadcast::Sender<SessionEvent>,
}

impl StorySession {
    /// Creates the session and starts the channel's connect/retry loop.
    pub fn connect(config: ClientConfig) -> Result<Self, ConfigError> {
        let endpoint = config.endpoint()?;
        let (channel, channel_events, task) =
            ChannelManager::spawn(endpoint, config.reconnect_delay);
        Ok(Self::with_channel(config, channel, channel_events, Some(task)))
    }

    pub(crate) fn with_channel(
        config: ClientConfig,
        channel: ChannelHandle,
        channel_events: mpsc::UnboundedReceiver<ChannelEvent>,
        channel_task: Option<JoinHandle<()>>,
    ) -> Self {
        let (reveal, settled) = RevealEngine::new(config.reveal_speed);
        let (events, _) = broadcast::channel(1024);
        Self {
            config,
            channel,
            channel_events,
            channel_task,
            view: StoryView::default(),
            reveal,
            dialog: TextSurface::new(),
            settled,
            staged: None,
            events,
        }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// The surface the dialog reveal writes into.
    pub fn dialog_surface(&self) -> TextSurface {
        self.dialog.clone()
    }

    pub fn view(&self) -> &StoryView {
        &self.view
    }

    pub fn channel_state(&self) -> ChannelState {
        self.channel.state()
    }

    /// Processes channel events, reveal completions and user actions one at a
    /// time until `actions` closes, then tears the session down.
    pub async fn run(mut self, mut actions: mpsc::Receiver<UserAction>) {
        loop {
            tokio::select! {
                Some(event) = self.channel_events.recv() => self.handle_channel_event(event),
                Some(settled) = self.settled.recv() => self.handle_reveal_settled(settled),
                action = actions.recv() => match action {
                    Some(action) => {
                        self.handle_action(action);
                    }
                    None => break,
                },
            }
        }
        info!("session: user input closed, shutting down");
        self.shutdown();
    }

    /// Waits for the next channel event or reveal completion and applies it.
    /// Returns false once both sources are exhausted.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            Some(event) = self.channel_events.recv() => {
                self.handle_channel_event(event);
                true
            }
            Some(settled) = self.settled.recv() => {
                self.handle_reveal_settled(settled);
                true
            }
            else => false,
        }
    }

    pub fn handle_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Opened => {
                self.publish(SessionEvent::ChannelStateChanged(ChannelState::Open));
                self.set_controls(Controls::ready());
            }
            ChannelEvent::Closed => {
                self.publish(SessionEvent::ChannelStateChanged(ChannelState::Closed));
                self.set_controls(Controls::disabled());
            }
            ChannelEvent::Error(message) => {
                warn!(error = %message, "session: channel error");
                self.notify(CONNECTION_ERROR_NOTICE);
            }
            ChannelEvent::Frame(raw) => self.route_frame(&raw),
        }
    }

    pub fn handle_reveal_settled(&mut self, settled: RevealSettled) {
        let staged_for_this = self
            .staged
            .as_ref()
            .is_some_and(|staged| staged.ticket == settled.ticket);
        if !staged_for_this {
            debug!(ticket = settled.ticket.0, "session: settled reveal has no staged affordance");
            return;
        }

        match settled.outcome {
            RevealOutcome::Completed => {
                if let Some(staged) = self.staged.take() {
                    self.set_affordance(staged.affordance);
                }
            }
            RevealOutcome::Superseded => {
                debug!(ticket = settled.ticket.0, "session: reveal superseded");
                self.staged = None;
            }
        }
    }

    /// Stops the channel loop and any running reveal.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if let Some(task) = self.channel_task.take() {
            task.abort();
        }
        self.reveal.abort();
    }

    pub(crate) fn notify(&mut self, message: impl Into<String>) {
        let notice = Notice::new(message, self.config.notice_ttl);
        info!(notice = %notice.message, "session: notice");
        self.view.show_notice(notice.clone());
        self.publish(SessionEvent::Notice(notice));
    }

    pub(crate) fn append_log(&mut self, kind: LogKind, text: impl Into<String>) {
        let entry = self.view.append_log(kind, text);
        self.publish(SessionEvent::LogAppended(entry));
    }

    pub(crate) fn set_affordance(&mut self, affordance: Affordance) {
        if self.view.set_affordance(affordance) {
            self.publish(SessionEvent::AffordanceChanged(self.view.affordance().clone()));
        }
    }

    pub(crate) fn set_controls(&mut self, controls: Controls) {
        if self.view.set_controls(controls) {
            self.publish(SessionEvent::ControlsChanged(controls));
        }
    }

    pub(crate) fn set_character(&mut self, character: Option<String>) {
        if self.view.set_character(character.clone()) {
            self.publish(SessionEvent::CharacterChanged(character));
        }
    }

    pub(crate) fn publish(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

impl Drop for StorySession {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
