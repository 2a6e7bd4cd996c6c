//! Message Router: decodes inbound frames and applies them to the session.

use shared::protocol::{ContextPayload, ScenePayload, StoryEvent};
use tracing::{debug, info, warn};

use crate::{
    session::{SessionEvent, StagedAffordance, StorySession},
    view::{Affordance, Controls, Illustration, LogKind},
};

pub const DECODE_FAILED_NOTICE: &str = "Failed to process a message from the server";
pub const STORY_STARTED_ENTRY: &str = "Story started";

/// Text handed to the reveal: description and dialog, separated by a blank line.
/// Line endings are normalized to `\n`.
pub fn reveal_text(scene: &ScenePayload) -> String {
    let text = match (scene.description(), scene.dialog()) {
        (Some(description), Some(dialog)) => format!("{description}\n\n{dialog}"),
        (Some(text), None) | (None, Some(text)) => text.to_string(),
        (None, None) => String::new(),
    };
    text.replace("\r\n", "\n")
}

/// Transcript line for a dialog, prefixed with the speaker when known.
pub fn dialog_entry(scene: &ScenePayload) -> Option<String> {
    let dialog = scene.dialog()?;
    Some(match scene.character() {
        Some(name) => format!("{name}: {dialog}"),
        None => dialog.to_string(),
    })
}

impl StorySession {
    /// Decodes one raw frame and dispatches it. Undecodable frames are dropped
    /// with a notice.
    pub fn route_frame(&mut self, raw: &str) {
        match StoryEvent::decode(raw) {
            Ok(event) => self.dispatch(event),
            Err(err) => {
                warn!(error = %err, "router: dropping undecodable frame");
                self.notify(DECODE_FAILED_NOTICE);
            }
        }
    }

    pub fn dispatch(&mut self, event: StoryEvent) {
        match event {
            StoryEvent::SceneStart(scene) => self.start_story(&scene),
            StoryEvent::SceneUpdate(scene) => self.update_story(&scene),
            StoryEvent::ContextUpdate(context) => self.merge_context(&context),
            StoryEvent::Illustration { url, prompt } => {
                info!(%url, "router: illustration received");
                self.view.context_mut().illustration = Some(Illustration { url, prompt });
                self.publish(SessionEvent::ContextChanged(self.view.context().clone()));
            }
            StoryEvent::ErrorNotice(message) => {
                warn!(error = %message, "router: server reported an error");
                self.notify(message);
            }
            StoryEvent::Unrecognized(kind) => {
                debug!(kind = %kind, "router: ignoring unrecognized frame");
            }
        }
    }

    fn start_story(&mut self, scene: &ScenePayload) {
        info!("router: story started");
        self.view.reset_story();
        self.staged = None;
        self.publish(SessionEvent::LogCleared);
        self.publish(SessionEvent::CharacterChanged(None));
        self.publish(SessionEvent::AffordanceChanged(Affordance::Hidden));

        self.append_log(LogKind::Scene, STORY_STARTED_ENTRY);
        self.apply_scene(scene);
        self.set_controls(Controls::in_story());
    }

    fn update_story(&mut self, scene: &ScenePayload) {
        if self.view.hide_choices() {
            self.publish(SessionEvent::AffordanceChanged(self.view.affordance().clone()));
        }
        if let Some(description) = scene.description() {
            self.append_log(LogKind::Scene, description);
        }
        if let Some(entry) = dialog_entry(scene) {
            self.append_log(LogKind::Dialog, entry);
        }
        self.apply_scene(scene);
    }

    /// Shows the speaker, starts the reveal and stages the affordance the
    /// payload calls for. The affordance is decided here, once.
    fn apply_scene(&mut self, scene: &ScenePayload) {
        self.set_character(scene.character().map(str::to_owned));

        let text = reveal_text(scene);
        let affordance = Affordance::for_choices(scene.choice_texts());
        self.view.set_full_text(text.clone());

        if text.is_empty() {
            self.reveal.clear(&self.dialog);
            self.staged = None;
            self.set_affordance(affordance);
            return;
        }

        let ticket = self.reveal.reveal(&self.dialog, &text);
        self.staged = Some(StagedAffordance { ticket, affordance });
    }

    fn merge_context(&mut self, context: &ContextPayload) {
        if self.view.context_mut().merge(context) {
            self.publish(SessionEvent::ContextChanged(self.view.context().clone()));
        } else {
            debug!("router: context update carried no fields");
        }
    }
}

#[cfg(test)]
#[path = "tests/router_tests.rs"]
mod tests;
