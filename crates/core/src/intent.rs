use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

const BOOK_HOTEL: &str = "book hotel";
const BOOK_TAXI: &str = "book taxi";

const BOOKING_VERBS: &[&str] = &[
    "reserver",
    "réserver",
    "reservation",
    "réservation",
    "book",
    "booking",
];
const HOTEL_SIGNALS: &[&str] = &["hotel", "hôtel", "hebergement", "hébergement", "logement"];
const TAXI_SIGNALS: &[&str] = &["taxi", "chauffeur", "transport", "voiture"];
const BARE_HOTEL: &[&str] = &["hotel", "un hotel", "hôtel", "un hôtel"];
const BARE_TAXI: &[&str] = &["taxi", "un taxi"];

/// Canonical comparison form: accents stripped, lower-cased, trimmed.
///
/// Lower-casing runs before decomposition so characters whose lowercase form
/// carries a combining mark (e.g. `İ`) still come out mark-free, which keeps
/// the function idempotent.
pub fn normalize_text(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Maps a French booking request onto the English trigger vocabulary.
/// Utterances that carry no booking signal come back untouched.
pub fn bridge_french_query(utterance: &str) -> String {
    let normalized = normalize_text(utterance);

    if contains_any(&normalized, BOOKING_VERBS) {
        if contains_any(&normalized, HOTEL_SIGNALS) {
            return BOOK_HOTEL.to_string();
        }
        if contains_any(&normalized, TAXI_SIGNALS) {
            return BOOK_TAXI.to_string();
        }
    }

    if equals_any(&normalized, BARE_HOTEL) {
        return BOOK_HOTEL.to_string();
    }
    if equals_any(&normalized, BARE_TAXI) {
        return BOOK_TAXI.to_string();
    }

    utterance.to_string()
}

fn contains_any(input: &str, needles: &[&str]) -> bool {
    needles
        .iter()
        .any(|needle| input.contains(normalize_text(needle).as_str()))
}

fn equals_any(input: &str, candidates: &[&str]) -> bool {
    candidates
        .iter()
        .any(|candidate| input == normalize_text(candidate))
}
