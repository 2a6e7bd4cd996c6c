//! Input Controller: user actions to outbound frames, guarded by channel readiness.
//!
//! Actions never wait for a running reveal; a click during an animation is
//! sent straight away.

use shared::protocol::ClientAction;
use tracing::{debug, warn};

use crate::{session::StorySession, view::LogKind};

pub const NO_CONNECTION_NOTICE: &str = "No connection to the server";
pub const CONNECTION_LOST_NOTICE: &str = "Connection lost, reconnecting…";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Start,
    Next,
    Choose(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Sent,
    /// The channel was not open; a notice was shown.
    Refused,
    /// The matching control is disabled; nothing was sent.
    Ignored,
}

impl StorySession {
    pub fn handle_action(&mut self, action: UserAction) -> ActionOutcome {
        match action {
            UserAction::Start => self.start(),
            UserAction::Next => self.next(),
            UserAction::Choose(text) => self.choose(text),
        }
    }

    pub fn start(&mut self) -> ActionOutcome {
        let enabled = self.view.controls().start_enabled;
        self.send_guarded(ClientAction::StartStory, NO_CONNECTION_NOTICE, enabled)
    }

    pub fn next(&mut self) -> ActionOutcome {
        let enabled = self.view.controls().next_enabled;
        self.send_guarded(ClientAction::next(), CONNECTION_LOST_NOTICE, enabled)
    }

    /// Records the choice in the transcript, then advances with it.
    pub fn choose(&mut self, text: impl Into<String>) -> ActionOutcome {
        let text = text.into();
        self.append_log(LogKind::Choice, format!("Choice: {text}"));
        self.send_guarded(ClientAction::choose(text), CONNECTION_LOST_NOTICE, true)
    }

    fn send_guarded(
        &mut self,
        action: ClientAction,
        offline_notice: &str,
        enabled: bool,
    ) -> ActionOutcome {
        if !self.channel.is_open() {
            debug!(action = action.name(), state = %self.channel.state(), "input: channel not open");
            self.notify(offline_notice);
            return ActionOutcome::Refused;
        }
        if !enabled {
            debug!(action = action.name(), "input: control disabled, ignoring");
            return ActionOutcome::Ignored;
        }

        let name = action.name();
        match self.channel.send(action) {
            Ok(()) => {
                debug!(action = name, "input: action queued");
                ActionOutcome::Sent
            }
            Err(err) => {
                warn!(action = name, error = %err, "input: send failed");
                self.notify(offline_notice);
                ActionOutcome::Refused
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
