//! Per-conversation state machine.
//!
//! ```text
//! Active ──(all required fields set)──▶ AwaitingComment ──(comment)──▶ Ended
//!    └──────────────(message cap exceeded)──────────────────────────────▶ Ended
//! ```
//!
//! Each call to [`Conversation::handle`] is one turn. A turn always produces a
//! reply and always attempts to persist the lead; no collaborator failure
//! escapes it.

use serde::Serialize;

use crate::catalog;
use crate::context::AppContext;
use crate::extraction::{self, Target};
use crate::lead::{Lead, Role};
use crate::questions::question_for;
use crate::recommend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationState {
    Active,
    /// Every required field is set; waiting for the free-text comment.
    AwaitingComment,
    /// Terminal. Completed or over the message cap.
    Ended,
}

/// Result of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub reply: String,
    pub state: ConversationState,
}

/// One live conversation and the lead it is filling.
#[derive(Debug, Clone)]
pub struct Conversation {
    lead: Lead,
    state: ConversationState,
}

impl Conversation {
    /// A brand-new conversation.
    #[must_use]
    pub fn start(conversation_id: impl Into<String>) -> Self {
        Self {
            lead: Lead::new(conversation_id),
            state: ConversationState::Active,
        }
    }

    /// Resume from a stored lead, deriving where the conversation stands.
    #[must_use]
    pub fn resume(lead: Lead, max_messages: u32) -> Self {
        let state = if lead.message_count > max_messages
            || (lead.is_complete() && lead.comment.is_some())
        {
            ConversationState::Ended
        } else if lead.is_complete() {
            ConversationState::AwaitingComment
        } else {
            ConversationState::Active
        };

        Self { lead, state }
    }

    /// Process one visitor message and return the reply.
    pub fn handle(&mut self, ctx: &AppContext, message: &str) -> Turn {
        self.lead.message_count += 1;

        if self.state == ConversationState::Ended || self.lead.message_count > ctx.chat.max_messages
        {
            if self.state != ConversationState::Ended {
                tracing::info!(
                    "Conversation {} reached the {}-message cap",
                    self.lead.conversation_id,
                    ctx.chat.max_messages
                );
                self.state = ConversationState::Ended;
            }
            self.persist(ctx);
            return Turn {
                reply: catalog::closing_message(&ctx.chat.contact_phone),
                state: self.state,
            };
        }

        self.lead.record(Role::User, message);

        let extraction = extraction::extract(
            ctx.model.as_ref(),
            &self.lead,
            message,
            ctx.chat.context_window,
        );
        let extracted = extraction.updates.len();
        let mut changed = false;
        for update in extraction.updates {
            changed |= self.lead.apply(update);
        }

        tracing::debug!(
            "Turn {} for {}: {:?} extracted {extracted}, changed={changed}, {} missing",
            self.lead.message_count,
            self.lead.conversation_id,
            extraction.source,
            self.lead.missing_fields().len(),
        );

        let reply = self.respond(ctx, changed);
        self.lead.record(Role::Assistant, reply.as_str());
        self.persist(ctx);

        Turn {
            reply,
            state: self.state,
        }
    }

    fn respond(&mut self, ctx: &AppContext, changed: bool) -> String {
        let complete = self.lead.is_complete();

        if !changed {
            if complete {
                self.state = ConversationState::AwaitingComment;
            }
            return question_for(Target::for_lead(&self.lead));
        }

        if !complete {
            return question_for(Target::for_lead(&self.lead));
        }

        if self.lead.comment.is_none() {
            self.state = ConversationState::AwaitingComment;
            return catalog::COMMENT_PROMPT.to_string();
        }

        let recommendation = recommend::recommend(
            ctx.model.as_ref(),
            ctx.embedder.as_ref(),
            ctx.search.as_ref(),
            &self.lead,
            ctx.chat.top_k,
        );
        self.state = ConversationState::Ended;
        tracing::info!(
            "Conversation {} completed (degraded analysis: {})",
            self.lead.conversation_id,
            recommendation.degraded
        );
        recommend::render(&recommendation, &self.lead)
    }

    /// Best effort: the in-memory lead stays authoritative if this fails.
    fn persist(&self, ctx: &AppContext) {
        if let Err(e) = ctx.store.save(&self.lead) {
            tracing::warn!(
                "Could not save lead {}: {e:#}",
                self.lead.conversation_id
            );
        }
    }
}
