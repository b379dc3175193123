//! Overlay state and the egui panels that draw it.

mod panels;

use crate::chat::{ChatMessage, Role};
use crate::scene::{PoiId, VisitorId};
use crate::world::UiEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Visitor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Overlay {
    #[default]
    Hidden,
    Chat {
        visitor: VisitorId,
        name: String,
    },
    Artwork {
        poi: PoiId,
        image_ref: String,
    },
}

/// What the user did in an overlay this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    SendChat(String),
    CloseChat,
    CloseArtwork,
}

#[derive(Debug, Default)]
pub struct UiState {
    overlay: Overlay,
    transcript: Vec<TranscriptLine>,
    draft: String,
}

impl UiState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn transcript(&self) -> &[TranscriptLine] {
        &self.transcript
    }

    pub fn apply(&mut self, event: UiEvent) {
        match event {
            UiEvent::ChatOpened {
                visitor,
                name,
                history,
            } => {
                self.transcript = history.iter().map(line_from_history).collect();
                self.draft.clear();
                self.overlay = Overlay::Chat { visitor, name };
            }
            UiEvent::ChatMessage {
                visitor,
                role,
                text,
            } => {
                if !matches!(self.overlay, Overlay::Chat { visitor: active, .. } if active == visitor) {
                    return;
                }
                self.transcript.push(TranscriptLine {
                    speaker: speaker_for(role),
                    text,
                });
            }
            UiEvent::ChatClosed { .. } | UiEvent::PoiOverlayClosed { .. } => {
                self.overlay = Overlay::Hidden;
                self.transcript.clear();
                self.draft.clear();
            }
            UiEvent::PoiOverlayOpened { poi, image_ref } => {
                self.overlay = Overlay::Artwork { poi, image_ref };
            }
        }
    }

    /// Hands out the trimmed draft and empties the field. Blank drafts stay
    /// put and yield nothing.
    fn take_draft(&mut self) -> Option<String> {
        let line = self.draft.trim();
        if line.is_empty() {
            return None;
        }
        let line = line.to_string();
        self.draft.clear();
        Some(line)
    }

    /// True while the visitor has not answered the latest user line.
    fn awaiting_reply(&self) -> bool {
        self.transcript
            .last()
            .map_or(true, |line| line.speaker == Speaker::User)
    }
}

fn speaker_for(role: Role) -> Speaker {
    match role {
        Role::User => Speaker::User,
        Role::Assistant | Role::System => Speaker::Visitor,
    }
}

fn line_from_history(message: &ChatMessage) -> TranscriptLine {
    TranscriptLine {
        speaker: speaker_for(message.role),
        text: message.content.clone(),
    }
}
