mod fallback;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{Duration, Utc};
use parley_core::{
    ChatInput, ChatReply, ConversationSession, ConversationTurn, FollowUp, Language, MatchResult,
    ReplySource, RuleSet,
};
use parley_observability::AppMetrics;
use parley_storage::SessionRepository;
use tracing::{info, instrument};
use uuid::Uuid;

pub use fallback::{CannedFallback, FallbackResponder};

const MAX_SESSION_TURNS: usize = 40;
const DEFAULT_SESSION_TTL_HOURS: i64 = 24;

/// Per-message conversation handler: rule match first, fallback collaborator
/// when nothing matches, then history persistence.
#[derive(Clone)]
pub struct ConciergeAgent<S, F>
where
    S: SessionRepository,
    F: FallbackResponder,
{
    rules: Arc<RuleSet>,
    fallback: Arc<F>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
    session_ttl: Duration,
}

impl<S, F> ConciergeAgent<S, F>
where
    S: SessionRepository,
    F: FallbackResponder,
{
    pub fn new(rules: Arc<RuleSet>, fallback: Arc<F>, store: Arc<S>, metrics: Arc<AppMetrics>) -> Self {
        Self {
            rules,
            fallback,
            store,
            metrics,
            session_ttl: Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn match_text(&self, text: &str, language: Option<&str>) -> Option<MatchResult> {
        let hit = self.rules.match_utterance(text, language);
        self.metrics
            .record_lookup(Language::resolve(language), hit.is_some());
        hit
    }

    pub fn metrics(&self) -> &AppMetrics {
        &self.metrics
    }

    #[instrument(skip(self, input))]
    pub async fn handle_chat(&self, input: ChatInput) -> Result<ChatReply> {
        let started = Instant::now();

        let language = Language::resolve(input.language.as_deref());
        let session_id = input
            .session_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let session = self
            .store
            .load_session(&session_id)
            .await?
            .filter(|session| session.expires_at > Utc::now());
        let new_session = session.is_none();
        let mut session = session.unwrap_or_else(|| ConversationSession {
            session_id: session_id.clone(),
            user_id: None,
            language,
            expires_at: Utc::now() + self.session_ttl,
            turns: Vec::new(),
        });

        let matched = self.rules.match_utterance(&input.text, Some(language.as_code()));
        let (reply_text, intent, source) = match matched {
            Some(hit) => (hit.response, Some(hit.intent_id), ReplySource::Rule),
            None => {
                let text = self
                    .fallback
                    .respond(&input.text, language, &session.turns)
                    .await?;
                (text, None, ReplySource::Fallback)
            }
        };
        let follow_up = intent.as_deref().and_then(FollowUp::for_intent);

        session.language = language;
        if let Some(user_id) = input.user_id.as_deref() {
            session.user_id = Some(user_id.to_string());
        }
        session.expires_at = Utc::now() + self.session_ttl;
        session.turns.push(ConversationTurn {
            at: Utc::now(),
            user_text: input.text.clone(),
            assistant_text: reply_text.clone(),
            intent: intent.clone(),
        });
        if session.turns.len() > MAX_SESSION_TURNS {
            let keep_from = session.turns.len() - MAX_SESSION_TURNS;
            session.turns = session.turns.split_off(keep_from);
        }
        self.store.upsert_session(&session).await?;

        self.metrics
            .record_chat_turn(language, source, new_session, started.elapsed());
        info!(
            session_id = %session_id,
            language = %language.as_code(),
            intent = intent.as_deref().unwrap_or("none"),
            source = ?source,
            "chat handled"
        );

        Ok(ChatReply {
            session_id,
            reply_text,
            language,
            intent,
            source,
            follow_up,
        })
    }

    pub async fn purge_expired_sessions(&self) -> Result<u64> {
        self.store.purge_expired(Utc::now()).await
    }
}
