use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    En,
    Fr,
}

impl Language {
    /// Resolves a caller-supplied language hint. Anything that is not French
    /// (including a missing or empty hint) is English.
    pub fn resolve(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v.starts_with("fr") => Self::Fr,
            _ => Self::En,
        }
    }

    pub fn as_code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Fr => "fr",
        }
    }
}

/// Canned response text for one intent, keyed by language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responses {
    pub en: Option<String>,
    pub fr: Option<String>,
}

impl Responses {
    pub fn new(en: Option<String>, fr: Option<String>) -> Self {
        Self { en, fr }
    }

    /// French wins only when asked for and non-empty; otherwise the English
    /// text, or an empty string when the rule carries no response at all.
    pub fn select(&self, language: Language) -> String {
        if language == Language::Fr {
            if let Some(fr) = self.fr.as_deref().filter(|text| !text.trim().is_empty()) {
                return fr.to_string();
            }
        }

        self.en.clone().unwrap_or_default()
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut languages = Vec::new();
        if self.en.as_deref().is_some_and(|text| !text.trim().is_empty()) {
            languages.push(Language::En);
        }
        if self.fr.as_deref().is_some_and(|text| !text.trim().is_empty()) {
            languages.push(Language::Fr);
        }
        languages
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub intent_id: String,
    pub patterns: Vec<String>,
    pub responses: Responses,
}

impl Rule {
    pub fn new(intent_id: impl Into<String>, patterns: Vec<String>, responses: Responses) -> Self {
        Self {
            intent_id: intent_id.into(),
            patterns,
            responses,
        }
    }
}

/// Produced while scanning, discarded once the best one is picked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCandidate {
    pub intent_id: String,
    pub response: String,
    pub specificity: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub intent_id: String,
    pub response: String,
}

impl From<MatchCandidate> for MatchResult {
    fn from(candidate: MatchCandidate) -> Self {
        Self {
            intent_id: candidate.intent_id,
            response: candidate.response,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUp {
    HotelBooking,
    TaxiBooking,
}

impl FollowUp {
    pub fn for_intent(intent_id: &str) -> Option<Self> {
        match intent_id.trim().to_lowercase().as_str() {
            "book_hotel" | "reserver_hotel" | "reservation_hotel" => Some(Self::HotelBooking),
            "book_taxi" | "reserver_taxi" | "reservation_taxi" => Some(Self::TaxiBooking),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Rule,
    Fallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatInput {
    pub session_id: Option<String>,
    pub text: String,
    pub language: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub reply_text: String,
    pub language: Language,
    pub intent: Option<String>,
    pub source: ReplySource,
    pub follow_up: Option<FollowUp>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub at: DateTime<Utc>,
    pub user_text: String,
    pub assistant_text: String,
    pub intent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub user_id: Option<String>,
    pub language: Language,
    pub expires_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}
