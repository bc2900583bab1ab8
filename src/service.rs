//! Session table in front of the conversation state machine.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::catalog;
use crate::context::AppContext;
use crate::conversation::{Conversation, ConversationState};

/// Conversation status as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatStatus {
    #[serde(rename = "en_cours")]
    InProgress,
    #[serde(rename = "terminee")]
    Finished,
}

impl From<ConversationState> for ChatStatus {
    fn from(state: ConversationState) -> Self {
        match state {
            ConversationState::Active | ConversationState::AwaitingComment => Self::InProgress,
            ConversationState::Ended => Self::Finished,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub conversation_id: String,
    pub status: ChatStatus,
}

type Session = Arc<Mutex<Conversation>>;

/// Routes messages to their conversation, reloading from the store on a miss.
///
/// Turns for different conversations run concurrently; turns for the same
/// conversation are serialized. Only live conversations stay cached: a session
/// is created on its first message and dropped once it ends, since reloading
/// an ended lead derives the ended state again.
pub struct ChatService {
    ctx: AppContext,
    sessions: Mutex<HashMap<String, Session>>,
}

impl ChatService {
    #[must_use]
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub const fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Open a new conversation and greet the visitor.
    ///
    /// The greeting is not a visitor message and does not count against the cap.
    /// Nothing is cached until the first message arrives.
    #[must_use]
    pub fn start(&self) -> ChatResponse {
        let conversation_id = new_conversation_id();
        tracing::debug!("Started conversation {conversation_id}");

        ChatResponse {
            content: catalog::WELCOME_MESSAGE.to_string(),
            conversation_id,
            status: ChatStatus::InProgress,
        }
    }

    /// Run one turn. An empty `conversation_id` starts a new conversation.
    pub fn submit(&self, conversation_id: &str, question: &str) -> ChatResponse {
        let conversation_id = match conversation_id.trim() {
            "" => new_conversation_id(),
            id => id.to_string(),
        };

        let session = self.session(&conversation_id);
        let turn = session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .handle(&self.ctx, question);

        if turn.state == ConversationState::Ended {
            self.release(&conversation_id, &session);
        }

        ChatResponse {
            content: turn.reply,
            conversation_id,
            status: turn.state.into(),
        }
    }

    /// Forget the cached state of a conversation. The stored lead is kept.
    pub fn evict(&self, conversation_id: &str) -> bool {
        self.sessions().remove(conversation_id).is_some()
    }

    /// Drop `session` from the table unless it was already replaced.
    fn release(&self, conversation_id: &str, session: &Session) {
        let mut sessions = self.sessions();
        if sessions
            .get(conversation_id)
            .is_some_and(|cached| Arc::ptr_eq(cached, session))
        {
            sessions.remove(conversation_id);
            tracing::debug!("Released ended conversation {conversation_id}");
        }
    }

    #[cfg(test)]
    pub fn cached(&self) -> usize {
        self.sessions().len()
    }

    fn session(&self, conversation_id: &str) -> Session {
        if let Some(session) = self.sessions().get(conversation_id) {
            return Arc::clone(session);
        }

        // Load outside the table lock; the store may be slow.
        let conversation = self.load(conversation_id);
        Arc::clone(
            self.sessions()
                .entry(conversation_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(conversation))),
        )
    }

    fn load(&self, conversation_id: &str) -> Conversation {
        match self.ctx.store.get(conversation_id) {
            Ok(Some(lead)) => {
                tracing::debug!(
                    "Resumed conversation {conversation_id} at message {}",
                    lead.message_count
                );
                Conversation::resume(lead, self.ctx.chat.max_messages)
            }
            Ok(None) => Conversation::start(conversation_id),
            Err(e) => {
                tracing::warn!("Could not load lead {conversation_id}, starting fresh: {e:#}");
                Conversation::start(conversation_id)
            }
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_conversation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
