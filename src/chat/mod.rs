//! The single gallery chat session.
//!
//! The coordinator owns per-visitor histories and the one open session. It
//! never talks to the network itself: it hands out `OutgoingRequest`s tagged
//! with a `ReplyTicket` and later judges each `ChatReply` against the session
//! that is open at that moment. A reply whose ticket no longer matches the
//! open session is dropped.

pub mod dispatch;
pub mod service;

pub use dispatch::{ChatDispatcher, ChatTransport};
pub use service::{ChatError, ChatService, OpenAiChatClient};

use crate::scene::VisitorId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const OPENING_QUESTION: &str = "What are you thinking as you look at this art? In less than 60 words.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Image reference attached to a user turn.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
            image: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            image: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

/// Identifies the session a request was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyTicket {
    pub visitor: VisitorId,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingRequest {
    pub ticket: ReplyTicket,
    pub request: ChatRequest,
}

#[derive(Debug)]
pub struct ChatReply {
    pub ticket: ReplyTicket,
    pub result: Result<String, ChatError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatSession {
    pub visitor: VisitorId,
    pub generation: u64,
    /// Requests issued for this session that have not resolved yet.
    pub pending: u32,
}

impl ChatSession {
    pub fn is_pending(&self) -> bool {
        self.pending > 0
    }

    fn ticket(&self) -> ReplyTicket {
        ReplyTicket {
            visitor: self.visitor,
            generation: self.generation,
        }
    }
}

/// Chat operations refused in the current state. Not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ChatRefusal {
    #[error("a chat with visitor {active} is already open")]
    SessionBusy { active: VisitorId },
    #[error("no chat is open")]
    NoSession,
    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    Applied { visitor: VisitorId, text: String },
    Discarded,
    Failed,
}

pub struct ChatCoordinator {
    session: Option<ChatSession>,
    next_generation: u64,
    histories: HashMap<VisitorId, Vec<ChatMessage>>,
    personalities: Vec<String>,
}

impl ChatCoordinator {
    pub fn new(personalities: Vec<String>) -> Self {
        Self {
            session: None,
            next_generation: 0,
            histories: HashMap::new(),
            personalities,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    #[cfg(test)]
    pub fn is_open(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_visitor(&self) -> Option<VisitorId> {
        self.session.map(|session| session.visitor)
    }

    pub fn claims(&self, visitor: VisitorId) -> bool {
        self.active_visitor() == Some(visitor)
    }

    pub fn history(&self, visitor: VisitorId) -> &[ChatMessage] {
        self.histories
            .get(&visitor)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Profile for a visitor id. Ids start at 1.
    pub fn personality(&self, visitor: VisitorId) -> &str {
        let index = (visitor as usize).checked_sub(1);
        match index.and_then(|index| self.personalities.get(index)) {
            Some(personality) => personality,
            None => {
                log::warn!("No personality for visitor {}; using the first", visitor);
                self.personalities
                    .first()
                    .map(String::as_str)
                    .unwrap_or("A quiet gallery visitor")
            }
        }
    }

    /// Opens a session and builds the opening remark request about the
    /// artwork the visitor is looking at.
    pub fn open(&mut self, visitor: VisitorId, image_ref: &str) -> Result<OutgoingRequest, ChatRefusal> {
        if let Some(active) = self.session {
            return Err(ChatRefusal::SessionBusy {
                active: active.visitor,
            });
        }
        self.next_generation += 1;
        let session = ChatSession {
            visitor,
            generation: self.next_generation,
            pending: 1,
        };
        self.session = Some(session);
        self.histories.entry(visitor).or_default();

        let personality = self.personality(visitor);
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(format!(
                    "You (gallery visitor) have this personality: {}.",
                    personality
                )),
                ChatMessage::user(OPENING_QUESTION).with_image(image_ref),
            ],
        };
        log::info!("Chat opened with visitor {}", visitor);
        Ok(OutgoingRequest {
            ticket: session.ticket(),
            request,
        })
    }

    /// Records the user's line, then builds the follow-up request carrying
    /// the whole history.
    pub fn send_user_message(&mut self, text: &str) -> Result<OutgoingRequest, ChatRefusal> {
        let text = text.trim();
        let Some(session) = self.session.as_mut() else {
            return Err(ChatRefusal::NoSession);
        };
        if text.is_empty() {
            return Err(ChatRefusal::EmptyMessage);
        }
        session.pending += 1;
        let session = *session;

        let history = self.histories.entry(session.visitor).or_default();
        history.push(ChatMessage::user(text));
        log::info!("You -> visitor {}: {}", session.visitor, text);

        let personality = self.personality(session.visitor);
        let mut messages = vec![ChatMessage::system(format!(
            "You have this personality {}.",
            personality
        ))];
        messages.extend(self.history(session.visitor).iter().cloned());
        Ok(OutgoingRequest {
            ticket: session.ticket(),
            request: ChatRequest { messages },
        })
    }

    /// Closes the open session, if any, returning its visitor.
    pub fn close(&mut self) -> Option<VisitorId> {
        let session = self.session.take()?;
        if session.is_pending() {
            log::debug!(
                "Chat with visitor {} closed with {} reply(ies) outstanding",
                session.visitor,
                session.pending
            );
        }
        log::info!("Chat with visitor {} closed", session.visitor);
        Some(session.visitor)
    }

    /// Applies a resolved request if it still belongs to the open session.
    pub fn apply_reply(&mut self, reply: ChatReply) -> ReplyOutcome {
        let Some(session) = self.session.as_mut() else {
            log::debug!("Dropping reply for visitor {}: chat closed", reply.ticket.visitor);
            return ReplyOutcome::Discarded;
        };
        if session.ticket() != reply.ticket {
            log::debug!(
                "Dropping stale reply for visitor {} (generation {})",
                reply.ticket.visitor,
                reply.ticket.generation
            );
            return ReplyOutcome::Discarded;
        }
        session.pending = session.pending.saturating_sub(1);

        match reply.result {
            Ok(text) => {
                let visitor = session.visitor;
                log::info!("Visitor {}: {}", visitor, text);
                self.histories
                    .entry(visitor)
                    .or_default()
                    .push(ChatMessage::assistant(text.clone()));
                ReplyOutcome::Applied { visitor, text }
            }
            Err(err) => {
                log::warn!("Chat service failed for visitor {}: {}", session.visitor, err);
                ReplyOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator() -> ChatCoordinator {
        ChatCoordinator::new(vec![
            "cheerful".to_string(),
            "grumpy".to_string(),
        ])
    }

    fn ok(ticket: ReplyTicket, text: &str) -> ChatReply {
        ChatReply {
            ticket,
            result: Ok(text.to_string()),
        }
    }

    #[test]
    fn opening_request_uses_personality_and_image() {
        let mut chat = coordinator();
        let outgoing = chat.open(2, "img/art.jpg").unwrap();

        let messages = &outgoing.request.messages;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(
            messages[0].content,
            "You (gallery visitor) have this personality: grumpy."
        );
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].image.as_deref(), Some("img/art.jpg"));
        // The opening prompt is not part of the visible history.
        assert!(chat.history(2).is_empty());
        assert!(chat.session().unwrap().is_pending());
    }

    #[test]
    fn second_open_is_refused() {
        let mut chat = coordinator();
        chat.open(1, "a").unwrap();
        assert_eq!(
            chat.open(2, "b").unwrap_err(),
            ChatRefusal::SessionBusy { active: 1 }
        );
        assert_eq!(chat.active_visitor(), Some(1));
    }

    #[test]
    fn user_line_recorded_before_request_is_built() {
        let mut chat = coordinator();
        let opening = chat.open(1, "a").unwrap();
        chat.apply_reply(ok(opening.ticket, "Lovely brushwork."));

        let outgoing = chat.send_user_message("  hello ").unwrap();
        assert_eq!(chat.history(1).last(), Some(&ChatMessage::user("hello")));

        let roles: Vec<Role> = outgoing.request.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::Assistant, Role::User]);
        assert_eq!(
            outgoing.request.messages[0].content,
            "You have this personality cheerful."
        );
    }

    #[test]
    fn send_requires_open_session_and_text() {
        let mut chat = coordinator();
        assert_eq!(chat.send_user_message("hi").unwrap_err(), ChatRefusal::NoSession);
        chat.open(1, "a").unwrap();
        assert_eq!(chat.send_user_message("   ").unwrap_err(), ChatRefusal::EmptyMessage);
        assert!(chat.history(1).is_empty());
    }

    #[test]
    fn reply_after_close_is_discarded() {
        let mut chat = coordinator();
        chat.open(1, "a").unwrap();
        let outgoing = chat.send_user_message("hello").unwrap();
        assert_eq!(chat.close(), Some(1));

        assert_eq!(chat.apply_reply(ok(outgoing.ticket, "late")), ReplyOutcome::Discarded);
        assert_eq!(chat.history(1).len(), 1);
    }

    #[test]
    fn reply_from_earlier_session_with_same_visitor_is_discarded() {
        let mut chat = coordinator();
        let first = chat.open(1, "a").unwrap();
        chat.close();
        chat.open(1, "a").unwrap();

        assert_eq!(chat.apply_reply(ok(first.ticket, "old")), ReplyOutcome::Discarded);
        assert!(chat.history(1).is_empty());
    }

    #[test]
    fn failure_keeps_session_open() {
        let mut chat = coordinator();
        let opening = chat.open(1, "a").unwrap();
        let outcome = chat.apply_reply(ChatReply {
            ticket: opening.ticket,
            result: Err(ChatError::RequestFailed("timeout".to_string())),
        });
        assert_eq!(outcome, ReplyOutcome::Failed);
        assert!(chat.is_open());
        assert!(!chat.session().unwrap().is_pending());
    }

    #[test]
    fn unknown_personality_falls_back() {
        let chat = coordinator();
        assert_eq!(chat.personality(9), "cheerful");
        assert_eq!(chat.personality(0), "cheerful");
    }
}
