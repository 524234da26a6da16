pub mod intent;
pub mod matcher;
pub mod models;

pub use intent::{bridge_french_query, normalize_text};
pub use matcher::{match_intent, RuleSet};
pub use models::*;
