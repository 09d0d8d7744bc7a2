use tracing::warn;

use crate::error::{AnalysisError, Result};
use crate::prompt::{PromptPayload, compose_chat};
use crate::report::{AnalysisReport, ConversationTurn};

/// Assistant turn substituted when a follow-up call fails.
pub const ASSISTANT_APOLOGY: &str = "Sorry, I encountered an error. Please try again.";

const FRESH_GREETING: &str = "Hello! I am your AI Medical Assistant. How can I help you today? \
     Please describe your symptoms or ask a health-related question.";

const CONTEXT_GREETING: &str = "I've reviewed your recent analysis report. \
     Feel free to ask any questions you have about it.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    AwaitingReply,
}

/// A follow-up conversation. In-memory only; nothing survives the session.
///
/// One outstanding request at a time: `begin_turn` while a reply is pending
/// is rejected without dispatching. Prior report context does not expire on
/// its own but can be cleared explicitly.
pub struct ChatSession {
    transcript: Vec<ConversationTurn>,
    prior_context: Option<String>,
    state: ChatState,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            transcript: vec![ConversationTurn::assistant(FRESH_GREETING)],
            prior_context: None,
            state: ChatState::Idle,
        }
    }

    /// Start a session anchored to a previously produced report, serialized
    /// as prior context for every turn.
    pub fn with_report(report: &AnalysisReport) -> Self {
        let context = serde_json::to_string_pretty(report)
            .unwrap_or_else(|_| String::new());
        Self {
            transcript: vec![ConversationTurn::assistant(CONTEXT_GREETING)],
            prior_context: (!context.is_empty()).then_some(context),
            state: ChatState::Idle,
        }
    }

    /// Accept a user message and produce the instruction payload to
    /// dispatch. Rejects empty messages and rejects a second submission
    /// while a reply is outstanding.
    pub fn begin_turn(&mut self, message: &str) -> Result<PromptPayload> {
        if self.state == ChatState::AwaitingReply {
            return Err(AnalysisError::SessionBusy);
        }
        let message = message.trim();
        if message.is_empty() {
            return Err(AnalysisError::Input("Message cannot be empty.".to_string()));
        }

        let payload = compose_chat(message, self.prior_context.as_deref());
        self.transcript.push(ConversationTurn::user(message));
        self.state = ChatState::AwaitingReply;
        Ok(payload)
    }

    /// Apply the outcome of the dispatched call. A failure substitutes the
    /// fixed apology as the assistant turn; either way the session returns
    /// to idle and stays re-submittable.
    pub fn complete_turn(&mut self, outcome: Result<String>) -> &ConversationTurn {
        let content = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "follow-up call failed, substituting apology");
                ASSISTANT_APOLOGY.to_string()
            }
        };
        self.transcript.push(ConversationTurn::assistant(content));
        self.state = ChatState::Idle;
        self.transcript.last().expect("transcript is never empty")
    }

    /// Drop the prior-report context. Later turns compose without it.
    pub fn clear_context(&mut self) {
        self.prior_context = None;
    }

    pub fn has_context(&self) -> bool {
        self.prior_context.is_some()
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.state == ChatState::AwaitingReply
    }

    pub fn transcript(&self) -> &[ConversationTurn] {
        &self.transcript
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}
