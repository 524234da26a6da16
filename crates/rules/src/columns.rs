use csv::StringRecord;
use parley_core::{Responses, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Field {
    Intent,
    Patterns,
    ResponseEn,
    ResponseFr,
}

impl Field {
    /// Accepted header names, highest priority first.
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Intent => &["intent", "name", "id"],
            Self::Patterns => &["patterns", "keywords", "phrases"],
            Self::ResponseEn => &["response_en", "reponse_en", "en", "response", "reponse"],
            Self::ResponseFr => &["response_fr", "reponse_fr", "fr"],
        }
    }
}

/// Column positions for each field, resolved from a header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    intent: Option<usize>,
    patterns: Option<usize>,
    response_en: Option<usize>,
    response_fr: Option<usize>,
}

impl ColumnMap {
    pub(crate) fn resolve(headers: &StringRecord) -> Self {
        let names = headers
            .iter()
            .map(|name| name.trim_start_matches('\u{feff}').trim().to_lowercase())
            .collect::<Vec<_>>();

        let position = |field: Field| {
            field
                .aliases()
                .iter()
                .find_map(|alias| names.iter().position(|name| name.as_str() == *alias))
        };

        Self {
            intent: position(Field::Intent),
            patterns: position(Field::Patterns),
            response_en: position(Field::ResponseEn),
            response_fr: position(Field::ResponseFr),
        }
    }

    pub(crate) fn has_intent(&self) -> bool {
        self.intent.is_some()
    }

    /// Builds a rule from one data row, or `None` when the row has no intent
    /// name or no usable pattern.
    pub(crate) fn rule_from(&self, record: &StringRecord) -> Option<Rule> {
        let intent = cell(record, self.intent)?.trim();
        if intent.is_empty() {
            return None;
        }

        let patterns = cell(record, self.patterns)
            .map(|raw| {
                raw.split('|')
                    .map(str::trim)
                    .filter(|pattern| !pattern.is_empty())
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        if patterns.is_empty() {
            return None;
        }

        let response_en = response(record, self.response_en);
        let response_fr = response(record, self.response_fr);

        Some(Rule::new(
            intent,
            patterns,
            Responses::new(response_en, response_fr),
        ))
    }
}

fn cell(record: &StringRecord, index: Option<usize>) -> Option<&str> {
    index.and_then(|index| record.get(index))
}

fn response(record: &StringRecord, index: Option<usize>) -> Option<String> {
    cell(record, index)
        .filter(|text| !text.trim().is_empty())
        .map(ToString::to_string)
}
