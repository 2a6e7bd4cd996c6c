//! Story View State: everything the front end shows, mutated only by the session.

use std::time::Duration;

use chrono::{DateTime, Local};
use shared::protocol::ContextPayload;
use tokio::time::Instant;

pub const GENDER_FALLBACK: &str = "-";
pub const AGE_FALLBACK: &str = "unknown";
pub const NAME_FALLBACK: &str = "-";
pub const LOCATION_FALLBACK: &str = "Unknown";
pub const PENDING_FALLBACK: &str = "Information updating…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    Scene,
    Dialog,
    Choice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub timestamp: DateTime<Local>,
    pub text: String,
}

/// Running transcript of one story. Append-only between story starts.
#[derive(Debug, Clone, Default)]
pub struct ProgressLog {
    entries: Vec<LogEntry>,
}

impl ProgressLog {
    pub fn push(&mut self, kind: LogKind, text: impl Into<String>) -> &LogEntry {
        self.entries.push(LogEntry {
            kind,
            timestamp: Local::now(),
            text: text.into(),
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// What the user can do to advance the story. Choices and the "next" control
/// are variants of one value, so they are never offered together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Affordance {
    #[default]
    Hidden,
    Next,
    Choices(Vec<String>),
}

impl Affordance {
    pub fn for_choices(choices: Vec<String>) -> Self {
        if choices.is_empty() {
            Self::Next
        } else {
            Self::Choices(choices)
        }
    }

    pub fn next_visible(&self) -> bool {
        matches!(self, Self::Next)
    }

    pub fn choices(&self) -> &[String] {
        match self {
            Self::Choices(choices) => choices,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Controls {
    pub start_enabled: bool,
    pub next_enabled: bool,
}

impl Controls {
    /// Baseline after the channel opens.
    pub fn ready() -> Self {
        Self {
            start_enabled: true,
            next_enabled: false,
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn in_story() -> Self {
        Self {
            start_enabled: false,
            next_enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Illustration {
    pub url: String,
    pub prompt: Option<String>,
}

/// Auxiliary context display: character sheet, timeline and current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPanel {
    pub name: String,
    pub gender: String,
    pub age: String,
    pub timeline: Vec<String>,
    pub location: String,
    pub scene: String,
    pub goal: String,
    pub illustration: Option<Illustration>,
}

impl Default for ContextPanel {
    fn default() -> Self {
        Self {
            name: NAME_FALLBACK.into(),
            gender: GENDER_FALLBACK.into(),
            age: AGE_FALLBACK.into(),
            timeline: Vec::new(),
            location: LOCATION_FALLBACK.into(),
            scene: PENDING_FALLBACK.into(),
            goal: PENDING_FALLBACK.into(),
            illustration: None,
        }
    }
}

impl ContextPanel {
    /// Merges the present sections of `payload`. Returns false when it carried none.
    pub fn merge(&mut self, payload: &ContextPayload) -> bool {
        if payload.is_empty() {
            return false;
        }

        if let Some(sheet) = payload.sheet() {
            self.name = sheet.name().unwrap_or(NAME_FALLBACK).to_string();
            self.gender = sheet.gender().unwrap_or(GENDER_FALLBACK).to_string();
            self.age = sheet.age().unwrap_or_else(|| AGE_FALLBACK.to_string());
        }

        if let Some(timeline) = &payload.timeline {
            self.timeline = timeline.clone();
        }

        if let Some(state) = &payload.current_state {
            self.location = state.location().unwrap_or(LOCATION_FALLBACK).to_string();
            self.scene = state.scene().unwrap_or(PENDING_FALLBACK).to_string();
            self.goal = state.goal().unwrap_or(PENDING_FALLBACK).to_string();
        }

        true
    }
}

/// Transient user-visible message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub expires_at: Instant,
}

impl Notice {
    pub fn new(message: impl Into<String>, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_active(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoryView {
    log: ProgressLog,
    character: Option<String>,
    full_text: String,
    affordance: Affordance,
    controls: Controls,
    context: ContextPanel,
    notice: Option<Notice>,
}

impl StoryView {
    pub fn log(&self) -> &ProgressLog {
        &self.log
    }

    pub fn character(&self) -> Option<&str> {
        self.character.as_deref()
    }

    /// Full text of the latest reveal, independent of how much has been typed out.
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    pub fn affordance(&self) -> &Affordance {
        &self.affordance
    }

    pub fn choices(&self) -> &[String] {
        self.affordance.choices()
    }

    pub fn next_visible(&self) -> bool {
        self.affordance.next_visible()
    }

    pub fn controls(&self) -> Controls {
        self.controls
    }

    pub fn context(&self) -> &ContextPanel {
        &self.context
    }

    /// The latest notice, until it expires.
    pub fn active_notice(&self) -> Option<&Notice> {
        self.notice.as_ref().filter(|notice| notice.is_active())
    }

    /// Clears the transcript and the display for a new story. Context is kept.
    pub(crate) fn reset_story(&mut self) {
        self.log.clear();
        self.character = None;
        self.full_text.clear();
        self.affordance = Affordance::Hidden;
    }

    pub(crate) fn append_log(&mut self, kind: LogKind, text: impl Into<String>) -> LogEntry {
        self.log.push(kind, text).clone()
    }

    pub(crate) fn set_character(&mut self, character: Option<String>) -> bool {
        if self.character == character {
            return false;
        }
        self.character = character;
        true
    }

    pub(crate) fn set_full_text(&mut self, text: String) {
        self.full_text = text;
    }

    pub(crate) fn set_affordance(&mut self, affordance: Affordance) -> bool {
        if self.affordance == affordance {
            return false;
        }
        self.affordance = affordance;
        true
    }

    /// Hides a visible choice set; a visible "next" control stays as it is.
    pub(crate) fn hide_choices(&mut self) -> bool {
        if matches!(self.affordance, Affordance::Choices(_)) {
            self.affordance = Affordance::Hidden;
            return true;
        }
        false
    }

    pub(crate) fn set_controls(&mut self, controls: Controls) -> bool {
        if self.controls == controls {
            return false;
        }
        self.controls = controls;
        true
    }

    pub(crate) fn context_mut(&mut self) -> &mut ContextPanel {
        &mut self.context
    }

    pub(crate) fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
