use crate::chat::{ChatError, ChatReply, ChatService, OutgoingRequest};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Where the world sends chat requests. Replies come back separately and
/// are handed to the world by whoever owns the transport.
pub trait ChatTransport {
    fn submit(&mut self, request: OutgoingRequest);
}

/// Runs chat requests on a background runtime and queues their results for
/// the render loop.
pub struct ChatDispatcher {
    runtime: tokio::runtime::Runtime,
    service: Arc<dyn ChatService>,
    sender: UnboundedSender<ChatReply>,
    receiver: UnboundedReceiver<ChatReply>,
}

impl ChatDispatcher {
    pub fn new(service: Arc<dyn ChatService>) -> Result<Self, ChatError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("gallery-chat")
            .enable_all()
            .build()?;
        let (sender, receiver) = mpsc::unbounded_channel();
        Ok(Self {
            runtime,
            service,
            sender,
            receiver,
        })
    }

    /// Replies resolved since the last call. Never blocks.
    pub fn drain(&mut self) -> Vec<ChatReply> {
        let mut replies = Vec::new();
        while let Ok(reply) = self.receiver.try_recv() {
            replies.push(reply);
        }
        replies
    }

    /// Handle to the background runtime, for other fetches that should stay
    /// off the render thread.
    pub fn handle(&self) -> tokio::runtime::Handle {
        self.runtime.handle().clone()
    }
}

impl ChatTransport for ChatDispatcher {
    fn submit(&mut self, outgoing: OutgoingRequest) {
        let service = Arc::clone(&self.service);
        let sender = self.sender.clone();
        let ticket = outgoing.ticket;
        log::debug!(
            "Submitting chat request for visitor {} ({} messages)",
            ticket.visitor,
            outgoing.request.messages.len()
        );
        self.runtime.spawn(async move {
            let result = service.complete(outgoing.request).await;
            if sender.send(ChatReply { ticket, result }).is_err() {
                log::debug!("Chat reply for visitor {} arrived after shutdown", ticket.visitor);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::service::MockChatService;
    use crate::chat::{ChatMessage, ChatRequest, ReplyTicket};
    use std::time::{Duration, Instant};

    fn outgoing(visitor: u32, text: &str) -> OutgoingRequest {
        OutgoingRequest {
            ticket: ReplyTicket {
                visitor,
                generation: 1,
            },
            request: ChatRequest {
                messages: vec![ChatMessage::user(text)],
            },
        }
    }

    fn drain_until(dispatcher: &mut ChatDispatcher, count: usize) -> Vec<ChatReply> {
        let started = Instant::now();
        let mut replies = Vec::new();
        while replies.len() < count && started.elapsed() < Duration::from_secs(5) {
            replies.extend(dispatcher.drain());
            std::thread::sleep(Duration::from_millis(5));
        }
        replies
    }

    #[test]
    fn replies_come_back_with_their_ticket() {
        let mut service = MockChatService::new();
        service
            .expect_complete()
            .times(2)
            .returning(|request| Ok(format!("echo {}", request.messages[0].content)));

        let mut dispatcher = ChatDispatcher::new(Arc::new(service)).unwrap();
        assert!(dispatcher.drain().is_empty());
        dispatcher.submit(outgoing(1, "one"));
        dispatcher.submit(outgoing(2, "two"));

        let mut replies = drain_until(&mut dispatcher, 2);
        replies.sort_by_key(|reply| reply.ticket.visitor);
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].ticket.visitor, 1);
        assert_eq!(replies[0].result.as_deref().unwrap(), "echo one");
        assert_eq!(replies[1].result.as_deref().unwrap(), "echo two");
    }

    #[test]
    fn service_errors_are_delivered_not_dropped() {
        let mut service = MockChatService::new();
        service
            .expect_complete()
            .returning(|_| Err(ChatError::RequestFailed("503".to_string())));

        let mut dispatcher = ChatDispatcher::new(Arc::new(service)).unwrap();
        dispatcher.submit(outgoing(3, "hello"));

        let replies = drain_until(&mut dispatcher, 1);
        assert_eq!(replies.len(), 1);
        assert!(matches!(replies[0].result, Err(ChatError::RequestFailed(_))));
    }
}
