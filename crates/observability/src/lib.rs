use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use parley_core::{Language, ReplySource};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Counters for chat turns and direct match lookups. Every update is mirrored
/// to the `metrics` facade with `language` / `source` labels.
#[derive(Debug, Default)]
pub struct AppMetrics {
    chat_turns_total: AtomicU64,
    french_turns_total: AtomicU64,
    rule_replies_total: AtomicU64,
    fallback_replies_total: AtomicU64,
    sessions_started_total: AtomicU64,
    match_lookups_total: AtomicU64,
    match_hits_total: AtomicU64,
    chat_latency_micros: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub chat_turns_total: u64,
    pub french_turns_total: u64,
    pub rule_replies_total: u64,
    pub fallback_replies_total: u64,
    pub sessions_started_total: u64,
    pub match_lookups_total: u64,
    pub match_hits_total: u64,
    /// Share of chat turns answered by a rule rather than the fallback.
    pub rule_coverage: f64,
    pub avg_chat_latency_micros: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_chat_turn(
        &self,
        language: Language,
        source: ReplySource,
        new_session: bool,
        latency: Duration,
    ) {
        self.chat_turns_total.fetch_add(1, Ordering::Relaxed);
        if language == Language::Fr {
            self.french_turns_total.fetch_add(1, Ordering::Relaxed);
        }
        match source {
            ReplySource::Rule => self.rule_replies_total.fetch_add(1, Ordering::Relaxed),
            ReplySource::Fallback => self.fallback_replies_total.fetch_add(1, Ordering::Relaxed),
        };
        if new_session {
            self.sessions_started_total.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("parley_sessions_started_total").increment(1);
        }
        self.chat_latency_micros
            .fetch_add(latency.as_micros() as u64, Ordering::Relaxed);

        metrics::counter!(
            "parley_chat_turns_total",
            "language" => language.as_code(),
            "source" => source_label(source)
        )
        .increment(1);
        metrics::histogram!("parley_chat_seconds").record(latency.as_secs_f64());
    }

    pub fn record_lookup(&self, language: Language, matched: bool) {
        self.match_lookups_total.fetch_add(1, Ordering::Relaxed);
        if matched {
            self.match_hits_total.fetch_add(1, Ordering::Relaxed);
        }
        let outcome = if matched { "hit" } else { "miss" };
        metrics::counter!(
            "parley_match_lookups_total",
            "language" => language.as_code(),
            "outcome" => outcome
        )
        .increment(1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let turns = self.chat_turns_total.load(Ordering::Relaxed);
        let rule_replies = self.rule_replies_total.load(Ordering::Relaxed);
        let latency = self.chat_latency_micros.load(Ordering::Relaxed);

        MetricsSnapshot {
            chat_turns_total: turns,
            french_turns_total: self.french_turns_total.load(Ordering::Relaxed),
            rule_replies_total: rule_replies,
            fallback_replies_total: self.fallback_replies_total.load(Ordering::Relaxed),
            sessions_started_total: self.sessions_started_total.load(Ordering::Relaxed),
            match_lookups_total: self.match_lookups_total.load(Ordering::Relaxed),
            match_hits_total: self.match_hits_total.load(Ordering::Relaxed),
            rule_coverage: ratio(rule_replies as f64, turns),
            avg_chat_latency_micros: ratio(latency as f64, turns),
        }
    }
}

fn ratio(value: f64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        value / count as f64
    }
}

fn source_label(source: ReplySource) -> &'static str {
    match source {
        ReplySource::Rule => "rule",
        ReplySource::Fallback => "fallback",
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,parley_agents=info,parley_rules=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}
