//! Conversation state for one CLI run

use crate::fallback;
use epiquoi_core::{
    CancellationToken, ChatClient, ChatError, ChatMessage, ChatResult, ChatResultOf,
    ConversationHistory, ProgressSink,
};
use tracing::debug;

/// What the next input means
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    /// Input is a question for the backend
    #[default]
    Chat,
    /// Input is a postal code for the offline campus lookup
    AwaitingPostalCode,
}

/// Outcome of one submitted line
#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    /// Blank input; nothing was recorded
    Ignored,
    /// The backend answered
    Answer(ChatMessage),
    /// The exchange failed and the session switched to the campus lookup
    Offline { error: ChatError, message: ChatMessage },
    /// Reply of the offline campus lookup
    Campus(ChatMessage),
    /// The user interrupted the exchange
    Cancelled,
}

/// In-memory conversation plus the current step
#[derive(Debug, Default)]
pub struct ChatSession {
    history: ConversationHistory,
    step: Step,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    /// Forget the conversation and go back to chat mode
    pub fn reset(&mut self) {
        self.history.clear();
        self.step = Step::Chat;
    }

    /// Handle one line typed by the user
    pub async fn submit(
        &mut self,
        client: &ChatClient,
        input: &str,
        on_progress: Option<ProgressSink<'_>>,
        cancel: CancellationToken,
    ) -> Turn {
        let text = input.trim();
        if text.is_empty() {
            return Turn::Ignored;
        }

        match self.step {
            Step::AwaitingPostalCode => self.answer_postal_code(text),
            Step::Chat => {
                // The backend gets the conversation as it was before this message
                let prior = self.history.len();
                self.history.push(ChatMessage::user(text));
                let outcome = client
                    .send_with_cancel(text, &self.history[..prior], on_progress, cancel)
                    .await;
                self.record_outcome(outcome)
            }
        }
    }

    /// Record the result of an exchange whose user message is already stored
    pub fn record_outcome(&mut self, outcome: ChatResultOf<ChatResult>) -> Turn {
        match outcome {
            Ok(result) => {
                let message = result.into_message();
                self.history.push(message.clone());
                Turn::Answer(message)
            }
            Err(ChatError::Cancelled) => Turn::Cancelled,
            Err(error) => {
                debug!("Switching to offline campus lookup after: {}", error);
                let message = ChatMessage::bot_error(fallback::OFFLINE_MESSAGE);
                self.history.push(message.clone());
                self.step = Step::AwaitingPostalCode;
                Turn::Offline { error, message }
            }
        }
    }

    /// Answer a postal code locally and return to chat mode
    pub fn answer_postal_code(&mut self, text: &str) -> Turn {
        self.history.push(ChatMessage::user(text));
        let message = ChatMessage::bot(fallback::campus_reply(text));
        self.history.push(message.clone());
        self.step = Step::Chat;
        Turn::Campus(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use epiquoi_core::{ClientConfig, Sender};

    #[test]
    fn test_answer_is_recorded() {
        let mut session = ChatSession::new();
        session.history.push(ChatMessage::user("Bonjour"));

        let turn = session.record_outcome(Ok(ChatResult::bot("Salut !")));

        assert!(matches!(turn, Turn::Answer(ref m) if m.text == "Salut !"));
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.step(), Step::Chat);
    }

    #[test]
    fn test_failure_switches_to_postal_code() {
        let mut session = ChatSession::new();

        let turn = session.record_outcome(Err(ChatError::http_status(500, "boom")));

        match turn {
            Turn::Offline { error, message } => {
                assert_eq!(error.status(), Some(500));
                assert!(message.is_error);
                assert!(message.text.contains("Quel est votre Code Postal ?"));
            }
            other => panic!("unexpected turn: {:?}", other),
        }
        assert_eq!(session.step(), Step::AwaitingPostalCode);
    }

    #[test]
    fn test_cancel_keeps_chat_mode() {
        let mut session = ChatSession::new();

        assert_eq!(session.record_outcome(Err(ChatError::Cancelled)), Turn::Cancelled);
        assert_eq!(session.step(), Step::Chat);
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_postal_code_returns_to_chat() {
        let mut session = ChatSession::new();
        session.record_outcome(Err(ChatError::StreamEndedWithoutResult));

        let turn = session.answer_postal_code("31400");

        assert!(matches!(turn, Turn::Campus(ref m) if m.text.contains("Toulouse")));
        assert_eq!(session.step(), Step::Chat);
        let senders: Vec<Sender> = session.history().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::Bot, Sender::User, Sender::Bot]);
    }

    #[test]
    fn test_reset() {
        let mut session = ChatSession::new();
        session.record_outcome(Err(ChatError::transport("refused")));
        session.reset();

        assert_eq!(session.step(), Step::Chat);
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_backend_then_postal_code() {
        let client = ChatClient::new(ClientConfig::with_base_url("http://127.0.0.1:9")).unwrap();
        let mut session = ChatSession::new();

        assert_eq!(
            session
                .submit(&client, "   ", None, CancellationToken::new())
                .await,
            Turn::Ignored
        );

        let turn = session
            .submit(&client, "Bonjour", None, CancellationToken::new())
            .await;
        assert!(matches!(turn, Turn::Offline { ref error, .. } if error.is_transport()));

        let turn = session
            .submit(&client, "13008", None, CancellationToken::new())
            .await;
        assert!(matches!(turn, Turn::Campus(ref m) if m.text.contains("Marseille")));
        assert_eq!(session.history().len(), 4);
    }
}
