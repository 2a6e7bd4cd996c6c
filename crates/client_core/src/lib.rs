//! Client-side session protocol and rendering state machine for the story
//! channel.

pub mod channel;
pub mod config;
pub mod error;
pub mod input;
pub mod reveal;
pub mod router;
pub mod session;
pub mod view;

pub use channel::{ChannelEvent, ChannelHandle, ChannelManager, ChannelState};
pub use config::ClientConfig;
pub use error::{ConfigError, SendError};
pub use input::{ActionOutcome, UserAction};
pub use reveal::{RevealEngine, RevealOutcome, RevealSettled, RevealTicket, TextSurface};
pub use session::{SessionEvent, StorySession};
pub use view::{Affordance, ContextPanel, Controls, LogEntry, LogKind, Notice, StoryView};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
