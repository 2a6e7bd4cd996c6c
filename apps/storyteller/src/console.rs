//! Line-oriented rendering of session events and parsing of typed commands.

use client_core::{
    reveal::SurfaceSnapshot, Affordance, ContextPanel, LogEntry, LogKind, SessionEvent,
    UserAction,
};

pub const HELP: &str = "commands: s(tart) | n(ext) | <choice number> | q(uit)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Action(UserAction),
    Quit,
    Help,
    Invalid(String),
}

/// Console-side memory of what is on screen: the offered choices and how far
/// the current reveal has been printed.
#[derive(Debug, Default)]
pub struct Console {
    choices: Vec<String>,
    reveal_generation: u64,
    reveal_printed: usize,
    line_open: bool,
}

impl Console {
    pub fn interpret(&self, line: &str) -> Command {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "s" | "start" => return Command::Action(UserAction::Start),
            "n" | "next" => return Command::Action(UserAction::Next),
            "q" | "quit" | "exit" => return Command::Quit,
            "" | "h" | "help" | "?" => return Command::Help,
            _ => {}
        }

        match line.parse::<usize>() {
            Ok(number) if (1..=self.choices.len()).contains(&number) => {
                Command::Action(UserAction::Choose(self.choices[number - 1].clone()))
            }
            Ok(number) => Command::Invalid(format!("no choice numbered {number}")),
            Err(_) => Command::Invalid(format!("unknown command '{line}'")),
        }
    }

    /// Text to print for `event`, if any. Tracks offered choices as a side effect.
    pub fn render_event(&mut self, event: &SessionEvent) -> Option<String> {
        match event {
            SessionEvent::ChannelStateChanged(state) => Some(format!("[channel {state}]")),
            SessionEvent::ControlsChanged(_) => None,
            SessionEvent::CharacterChanged(Some(name)) => Some(format!("== {name} ==")),
            SessionEvent::CharacterChanged(None) => None,
            SessionEvent::LogCleared => Some("---- new story ----".to_string()),
            SessionEvent::LogAppended(entry) => Some(render_entry(entry)),
            SessionEvent::AffordanceChanged(affordance) => {
                self.choices = affordance.choices().to_vec();
                render_affordance(affordance)
            }
            SessionEvent::ContextChanged(context) => Some(render_context(context)),
            SessionEvent::Notice(notice) => Some(format!("! {}", notice.message)),
        }
    }

    /// The not-yet-printed tail of a reveal surface. A new generation starts
    /// on a fresh line.
    pub fn render_reveal(&mut self, snapshot: &SurfaceSnapshot) -> String {
        let mut out = String::new();
        if snapshot.generation != self.reveal_generation {
            if self.line_open {
                out.push('\n');
            }
            self.reveal_generation = snapshot.generation;
            self.reveal_printed = 0;
        }
        if let Some(tail) = snapshot.content.get(self.reveal_printed..) {
            out.push_str(tail);
            self.reveal_printed = snapshot.content.len();
        }
        if !out.is_empty() {
            self.line_open = !out.ends_with('\n');
        }
        out
    }

    /// Whether a reveal line is open and should be ended before other output.
    pub fn take_open_reveal_line(&mut self) -> bool {
        std::mem::take(&mut self.line_open)
    }
}

fn render_entry(entry: &LogEntry) -> String {
    let tag = match entry.kind {
        LogKind::Scene => "scene",
        LogKind::Dialog => "dialog",
        LogKind::Choice => "you",
    };
    format!("{} [{tag}] {}", entry.timestamp.format("%H:%M:%S"), entry.text)
}

fn render_affordance(affordance: &Affordance) -> Option<String> {
    match affordance {
        Affordance::Hidden => None,
        Affordance::Next => Some("(n) next".to_string()),
        Affordance::Choices(choices) => Some(
            choices
                .iter()
                .enumerate()
                .map(|(index, text)| format!("  {}) {text}", index + 1))
                .collect::<Vec<_>>()
                .join("\n"),
        ),
    }
}

fn render_context(context: &ContextPanel) -> String {
    let mut lines = vec![
        format!("  character: {} ({}, {})", context.name, context.gender, context.age),
        format!("  location:  {}", context.location),
        format!("  scene:     {}", context.scene),
        format!("  goal:      {}", context.goal),
    ];
    if !context.timeline.is_empty() {
        lines.push(format!("  timeline:  {}", context.timeline.join(" > ")));
    }
    if let Some(illustration) = &context.illustration {
        lines.push(format!("  image:     {}", illustration.url));
    }
    format!("[context]\n{}", lines.join("\n"))
}

#[cfg(test)]
#[path = "tests/console_tests.rs"]
mod tests;
