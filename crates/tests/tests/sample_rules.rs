use std::path::PathBuf;

use parley_core::{match_intent, RuleSet};
use parley_rules::load_rules_from;

fn sample_rules() -> RuleSet {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/rules.csv");
    load_rules_from(path).expect("sample rules should load")
}

#[test]
fn sample_source_loads_every_row() {
    let rules = sample_rules();
    assert_eq!(rules.len(), 9);
    assert_eq!(rules.rules()[0].intent_id, "greeting");
}

#[test]
fn doubled_quotes_survive_loading() {
    let rules = sample_rules();
    let hit = match_intent(&rules, "what is the wifi password", Some("en")).expect("wifi");
    assert_eq!(hit.response, "The network is \"Guest\", password on your key card.");
}

#[test]
fn french_and_english_booking_agree() {
    let rules = sample_rules();
    let french = match_intent(&rules, "Je voudrais réserver un taxi", Some("fr-FR")).unwrap();
    let english = match_intent(&rules, "book taxi", Some("en")).unwrap();
    assert_eq!(french.intent_id, english.intent_id);
}

#[test]
fn accented_french_greeting_matches_plain_pattern() {
    let rules = sample_rules();
    let hit = match_intent(&rules, "À bientôt !", Some("fr")).expect("goodbye");
    assert_eq!(hit.intent_id, "goodbye");
    assert_eq!(hit.response, "Au revoir et bon voyage !");
}

#[test]
fn specific_booking_beats_generic_hotel() {
    let rules = sample_rules();
    let hit = match_intent(&rules, "can you book a hotel near the station", None).unwrap();
    assert_eq!(hit.intent_id, "book_hotel");

    let hit = match_intent(&rules, "is the hotel nice", None).unwrap();
    assert_eq!(hit.intent_id, "hotel_info");
}

#[test]
fn unsupported_language_uses_english_text() {
    let rules = sample_rules();
    let hit = match_intent(&rules, "merci", Some("es")).unwrap();
    assert_eq!(hit.response, "You're welcome!");
}

#[test]
fn weather_question_has_no_match() {
    let rules = sample_rules();
    assert!(match_intent(&rules, "what is the weather", Some("en")).is_none());
    assert!(match_intent(&rules, "quel temps fait-il", Some("fr")).is_none());
}
