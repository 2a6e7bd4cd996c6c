//! Reveal Engine: the typewriter animation for dialog and scene text.
//!
//! Each [`TextSurface`] carries a generation counter. Starting a reveal bumps
//! the generation and clears the surface; a running task checks its generation
//! before every write and stops once a newer reveal owns the surface.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurfaceSnapshot {
    pub generation: u64,
    pub content: String,
}

/// A text target that reveals write into and renderers observe.
#[derive(Debug, Clone)]
pub struct TextSurface {
    tx: Arc<watch::Sender<SurfaceSnapshot>>,
}

impl Default for TextSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl TextSurface {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(SurfaceSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<SurfaceSnapshot> {
        self.tx.subscribe()
    }

    pub fn content(&self) -> String {
        self.tx.borrow().content.clone()
    }

    pub fn generation(&self) -> u64 {
        self.tx.borrow().generation
    }

    /// Hands the surface to a new writer: bumps the generation and clears it.
    fn restart(&self) -> u64 {
        let mut generation = 0;
        self.tx.send_modify(|snapshot| {
            snapshot.generation += 1;
            snapshot.content.clear();
            generation = snapshot.generation;
        });
        generation
    }

    fn push_if_current(&self, generation: u64, ch: char) -> bool {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.generation != generation {
                return false;
            }
            snapshot.content.push(ch);
            true
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RevealTicket(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Completed,
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevealSettled {
    pub ticket: RevealTicket,
    pub outcome: RevealOutcome,
}

pub struct RevealEngine {
    speed: Duration,
    next_ticket: u64,
    settled: mpsc::UnboundedSender<RevealSettled>,
    active: Option<JoinHandle<()>>,
}

impl RevealEngine {
    /// Returns the engine and the receiver on which every reveal reports how it ended.
    pub fn new(speed: Duration) -> (Self, mpsc::UnboundedReceiver<RevealSettled>) {
        let (settled, settled_rx) = mpsc::unbounded_channel();
        (
            Self {
                speed,
                next_ticket: 0,
                settled,
                active: None,
            },
            settled_rx,
        )
    }

    pub fn reveal(&mut self, target: &TextSurface, text: &str) -> RevealTicket {
        self.reveal_with_speed(target, text, self.speed)
    }

    /// Clears `target` and types `text` into it, one character per `speed`.
    /// Any reveal already running on `target` stops before its next write.
    pub fn reveal_with_speed(
        &mut self,
        target: &TextSurface,
        text: &str,
        speed: Duration,
    ) -> RevealTicket {
        self.next_ticket += 1;
        let ticket = RevealTicket(self.next_ticket);
        let generation = target.restart();

        let target = target.clone();
        let text = text.to_owned();
        let settled = self.settled.clone();
        debug!(ticket = ticket.0, chars = text.chars().count(), "reveal: started");
        self.active = Some(tokio::spawn(async move {
            let outcome = type_out(&target, generation, &text, speed).await;
            debug!(ticket = ticket.0, ?outcome, "reveal: settled");
            let _ = settled.send(RevealSettled { ticket, outcome });
        }));
        ticket
    }

    /// Clears `target` without starting a new reveal.
    pub fn clear(&mut self, target: &TextSurface) {
        target.restart();
    }

    pub(crate) fn abort(&mut self) {
        if let Some(task) = self.active.take() {
            task.abort();
        }
    }
}

async fn type_out(target: &TextSurface, generation: u64, text: &str, speed: Duration) -> RevealOutcome {
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 && !target.push_if_current(generation, '\n') {
            return RevealOutcome::Superseded;
        }
        for ch in line.chars() {
            if !target.push_if_current(generation, ch) {
                return RevealOutcome::Superseded;
            }
            tokio::time::sleep(speed).await;
        }
    }

    if target.generation() == generation {
        RevealOutcome::Completed
    } else {
        RevealOutcome::Superseded
    }
}

#[cfg(test)]
#[path = "tests/reveal_tests.rs"]
mod tests;
