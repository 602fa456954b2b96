//! One generation session: request/response/editing state and the
//! transitions the UI renders.

use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use story::{GenerationRequest, Platform, ViralStory};

use crate::generate::{GenerateError, StoryBackend};
use crate::narrator::ThinkingNarrator;

#[derive(Debug)]
pub enum SessionState {
    Idle,
    Loading,
    Success(ViralStory),
    Error(String),
}

type Completion = (u64, Result<ViralStory, GenerateError>);

pub struct StorySession {
    state: SessionState,
    narrator: ThinkingNarrator,
    // Monotonic per submit; completions carrying an older number are stale
    // and get discarded.
    seq: u64,
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
    validation: Option<String>,
}

impl StorySession {
    pub fn new(narrator: ThinkingNarrator) -> Self {
        let (tx, rx) = unbounded();
        Self {
            state: SessionState::Idle,
            narrator,
            seq: 0,
            tx,
            rx,
            validation: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SessionState::Loading)
    }

    pub fn validation_message(&self) -> Option<&str> {
        self.validation.as_deref()
    }

    pub fn narrated_lines(&self) -> &[String] {
        self.narrator.lines()
    }

    pub fn narration_pending(&self) -> bool {
        self.narrator.has_pending()
    }

    /// Starts a generation call. An empty topic keeps the session where it is
    /// and raises a validation message; it never reaches the backend. A valid
    /// submit is allowed from any state and supersedes whatever came before.
    pub fn submit(
        &mut self,
        topic: &str,
        platform: Platform,
        backend: Arc<dyn StoryBackend>,
        now: Instant,
    ) -> bool {
        let request = match GenerationRequest::new(topic, platform) {
            Ok(request) => request,
            Err(_) => {
                self.validation = Some("Please enter a topic".to_string());
                return false;
            }
        };
        self.validation = None;
        self.seq += 1;
        let seq = self.seq;
        self.state = SessionState::Loading;
        self.narrator.start(now);
        tracing::info!(target: "session", "generation #{seq} submitted ({})", request.platform);

        let tx = self.tx.clone();
        thread::spawn(move || {
            let result = backend.generate(&request);
            let _ = tx.send((seq, result));
        });
        true
    }

    /// Drains finished calls and advances the narrator. Returns true when
    /// anything visible changed.
    pub fn poll(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok((seq, result)) = self.rx.try_recv() {
            if seq != self.seq {
                tracing::debug!(
                    target: "session",
                    "discarding stale completion #{seq} (current #{})",
                    self.seq
                );
                continue;
            }
            if !self.is_loading() {
                continue;
            }
            self.narrator.stop();
            self.state = match result {
                Ok(story) => {
                    tracing::info!(target: "session", "generation #{seq} succeeded");
                    SessionState::Success(story)
                }
                Err(err) => {
                    tracing::warn!(target: "session", "generation #{seq} failed: {err}");
                    SessionState::Error(err.to_string())
                }
            };
            changed = true;
        }
        if self.narrator.advance(now) > 0 {
            changed = true;
        }
        changed
    }

    /// Local, non-persisted edit of one scene's voiceover text. Only
    /// meaningful in the Success state.
    pub fn edit_scene_text(&mut self, scene_id: u32, text: &str) {
        if let SessionState::Success(story) = &mut self.state {
            story.set_scene_text(scene_id, text);
        }
    }
}
