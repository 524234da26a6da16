use regex::Regex;

use crate::intent::{bridge_french_query, normalize_text};
use crate::models::{Language, MatchCandidate, MatchResult, Rule};

#[derive(Debug, Clone)]
struct CompiledPattern {
    rule_index: usize,
    specificity: usize,
    matcher: Regex,
}

/// Immutable, ordered collection of rules with their patterns prepared for
/// matching. Built once at startup and shared by reference.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    patterns: Vec<CompiledPattern>,
    skipped_patterns: usize,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        let mut patterns = Vec::new();
        let mut skipped_patterns = 0;

        for (rule_index, rule) in rules.iter().enumerate() {
            for pattern in &rule.patterns {
                let normalized = normalize_text(pattern);
                if normalized.is_empty() {
                    skipped_patterns += 1;
                    continue;
                }

                // Bounded by a non-word character or the ends of the subject.
                let source = format!(r"(?:^|\W){}(?:\W|$)", regex::escape(&normalized));
                match Regex::new(&source) {
                    Ok(matcher) => patterns.push(CompiledPattern {
                        rule_index,
                        specificity: normalized.chars().count(),
                        matcher,
                    }),
                    Err(_) => skipped_patterns += 1,
                }
            }
        }

        Self {
            rules,
            patterns,
            skipped_patterns,
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Patterns that normalized to nothing or failed to compile. They can
    /// never match, so callers should surface a non-zero count.
    pub fn skipped_patterns(&self) -> usize {
        self.skipped_patterns
    }

    pub fn match_utterance(&self, utterance: &str, language: Option<&str>) -> Option<MatchResult> {
        match_intent(self, utterance, language)
    }
}

/// Finds the single most specific rule whose pattern appears in the utterance
/// as a whole word or phrase. Longest normalized pattern wins; equal lengths
/// keep the first one seen in rule order.
pub fn match_intent(rules: &RuleSet, utterance: &str, language: Option<&str>) -> Option<MatchResult> {
    if utterance.trim().is_empty() {
        return None;
    }

    let language = Language::resolve(language);
    let query = match language {
        Language::Fr => bridge_french_query(utterance),
        Language::En => utterance.to_string(),
    };

    let subject = normalize_text(&query);
    if subject.is_empty() {
        return None;
    }

    let mut best: Option<(usize, usize)> = None;
    for pattern in &rules.patterns {
        if !pattern.matcher.is_match(&subject) {
            continue;
        }

        let replace = match best {
            Some((_, specificity)) => pattern.specificity > specificity,
            None => true,
        };
        if replace {
            best = Some((pattern.rule_index, pattern.specificity));
        }
    }

    let (rule_index, specificity) = best?;
    let rule = rules.rules.get(rule_index)?;

    let candidate = MatchCandidate {
        intent_id: rule.intent_id.clone(),
        response: rule.responses.select(language),
        specificity,
    };

    Some(candidate.into())
}
