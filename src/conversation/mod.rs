use chrono::Utc;
use log::{ error, warn };
use std::sync::Arc;
use uuid::Uuid;

use crate::inference::InferenceClient;
use crate::models::chat::{ ChatMessage, Role };

/// Shown as an assistant turn whenever a request fails, so the user never
/// sees a stuck loading state.
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// Append-only message log. The only in-place mutation is `replace`, which
/// rewrites one message's content and timestamp while keeping its id, role
/// and position.
#[derive(Debug, Default)]
pub struct ConversationLog {
    messages: Vec<ChatMessage>,
}

impl ConversationLog {
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn replace(&mut self, id: Uuid, content: String) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content = content;
                message.timestamp = Utc::now().timestamp_millis();
                true
            }
            None => false,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: Uuid) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn last_assistant_id(&self) -> Option<Uuid> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.id)
    }

    fn position(&self, id: Uuid) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }
}

/// One conversation with the model. Enforces a single in-flight request:
/// submissions made while `pending` are ignored, matching the disabled
/// input in the original client.
pub struct ChatSession {
    log: ConversationLog,
    client: Arc<dyn InferenceClient>,
    pending: bool,
}

impl ChatSession {
    pub fn new(client: Arc<dyn InferenceClient>) -> Self {
        Self {
            log: ConversationLog::default(),
            client,
            pending: false,
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Sends one user turn and appends the reply. Returns the assistant
    /// message, which on failure carries [`ERROR_REPLY`] instead of model
    /// output. Empty submissions and submissions made while a request is
    /// outstanding are no-ops.
    pub async fn send(
        &mut self,
        content: &str,
        image: Option<Vec<u8>>
    ) -> Option<&ChatMessage> {
        if self.pending {
            warn!("A request is already in flight, ignoring submission");
            return None;
        }
        if content.trim().is_empty() && image.is_none() {
            return None;
        }

        let query = content.to_string();
        self.log.append(ChatMessage::user(content, image.clone()));
        self.pending = true;

        let reply = match self.client.send(&query, image.as_deref()).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("Chat completion failed: {}", err);
                ERROR_REPLY.to_string()
            }
        };

        self.pending = false;
        self.log.append(ChatMessage::assistant(reply));
        self.log.messages.last()
    }

    /// Regenerates one assistant message in place by re-sending the user
    /// turn directly before it. Any failure leaves the message untouched.
    pub async fn reload(&mut self, id: Uuid) -> bool {
        if self.pending {
            warn!("A request is already in flight, ignoring reload");
            return false;
        }

        let Some(index) = self.log.position(id) else {
            return false;
        };
        if self.log.messages[index].role != Role::Assistant {
            return false;
        }
        let prompt = match index.checked_sub(1).map(|i| &self.log.messages[i]) {
            Some(prev) if prev.role == Role::User => prev.content.clone(),
            _ => return false,
        };

        self.pending = true;
        let result = self.client.send(&prompt, None).await;
        self.pending = false;

        match result {
            Ok(reply) => self.log.replace(id, reply),
            Err(err) => {
                error!("Reload failed: {}", err);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::InferenceError;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::sync::atomic::{ AtomicUsize, Ordering };

    struct FixedReply {
        reply: String,
        calls: AtomicUsize,
    }

    impl FixedReply {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl InferenceClient for FixedReply {
        async fn send(
            &self,
            text: &str,
            image: Option<&[u8]>
        ) -> Result<String, InferenceError> {
            if text.trim().is_empty() && image.is_none() {
                return Err(InferenceError::InvalidInput);
            }
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.reply.clone())
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl InferenceClient for AlwaysFails {
        async fn send(
            &self,
            _text: &str,
            _image: Option<&[u8]>
        ) -> Result<String, InferenceError> {
            Err(InferenceError::Server {
                status: StatusCode::INTERNAL_SERVER_ERROR,
            })
        }
    }

    #[tokio::test]
    async fn send_appends_user_and_assistant_turns() {
        let mut session = ChatSession::new(Arc::new(FixedReply::new("4")));
        let reply = session.send("2+2?", None).await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "4");

        let messages = session.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "2+2?");
        assert_eq!(messages[1].role, Role::Assistant);
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn empty_submission_is_a_no_op() {
        let client = Arc::new(FixedReply::new("4"));
        let mut session = ChatSession::new(client.clone());
        assert!(session.send("   ", None).await.is_none());
        assert!(session.log().messages().is_empty());
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn server_error_appends_visible_error_turn() {
        let mut session = ChatSession::new(Arc::new(AlwaysFails));
        session.send("2+2?", None).await;

        let messages = session.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, ERROR_REPLY);
        assert!(!messages[1].content.is_empty());
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn reload_replaces_only_the_targeted_message() {
        let mut session = ChatSession::new(Arc::new(FixedReply::new("4")));
        session.send("2+2?", None).await;

        let target = session.log().last_assistant_id().unwrap();
        let before = session.log().get(target).unwrap().clone();

        // Swap in a client that answers differently on the retry.
        session.client = Arc::new(FixedReply::new("four"));
        assert!(session.reload(target).await);

        let messages = session.log().messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "2+2?");
        assert_eq!(messages[1].id, before.id);
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "four");
        assert!(messages[1].timestamp >= before.timestamp);
    }

    #[tokio::test]
    async fn reload_refuses_user_messages() {
        let mut session = ChatSession::new(Arc::new(FixedReply::new("4")));
        session.send("2+2?", None).await;
        let user_id = session.log().messages()[0].id;
        assert!(!session.reload(user_id).await);
        assert_eq!(session.log().messages()[0].content, "2+2?");
    }

    #[tokio::test]
    async fn reload_failure_leaves_message_untouched() {
        let mut session = ChatSession::new(Arc::new(FixedReply::new("4")));
        session.send("2+2?", None).await;
        let target = session.log().last_assistant_id().unwrap();

        session.client = Arc::new(AlwaysFails);
        assert!(!session.reload(target).await);
        assert_eq!(session.log().get(target).unwrap().content, "4");
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn reload_of_unknown_id_is_refused() {
        let mut session = ChatSession::new(Arc::new(FixedReply::new("4")));
        assert!(!session.reload(Uuid::new_v4()).await);
    }

    #[test]
    fn replace_preserves_id_and_position() {
        let mut log = ConversationLog::default();
        log.append(ChatMessage::user("q", None));
        log.append(ChatMessage::assistant("a1"));
        log.append(ChatMessage::user("q2", None));

        let id = log.messages()[1].id;
        assert!(log.replace(id, "a2".to_string()));
        assert_eq!(log.messages().len(), 3);
        assert_eq!(log.messages()[1].id, id);
        assert_eq!(log.messages()[1].content, "a2");
        assert_eq!(log.messages()[2].content, "q2");

        assert!(!log.replace(Uuid::new_v4(), "x".to_string()));
    }
}
