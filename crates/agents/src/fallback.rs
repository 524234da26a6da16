use anyhow::Result;
use parley_core::{ConversationTurn, Language};

/// Answers messages no rule matched. In production this is the language-model
/// collaborator; it receives the prior turns of the session as context.
pub trait FallbackResponder: Send + Sync {
    async fn respond(
        &self,
        text: &str,
        language: Language,
        history: &[ConversationTurn],
    ) -> Result<String>;
}

#[derive(Debug, Clone, Default)]
pub struct CannedFallback;

impl FallbackResponder for CannedFallback {
    async fn respond(
        &self,
        _text: &str,
        language: Language,
        _history: &[ConversationTurn],
    ) -> Result<String> {
        let reply = match language {
            Language::Fr => "Désolé, je n'ai pas bien compris. Pouvez-vous reformuler ?",
            Language::En => "Sorry, I didn't quite get that. Could you rephrase?",
        };
        Ok(reply.to_string())
    }
}
