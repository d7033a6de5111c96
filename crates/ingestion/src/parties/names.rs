//! Party name normalisation

use crate::script::contains_arabic;
use crate::pattern::compile;
use regex_lite::Regex;
use std::sync::LazyLock;

static AR_LEADING: LazyLock<Regex> = LazyLock::new(|| compile(r"^شركة\s+"));

static AR_TRAILING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"[\s,،]+(?:المحدودة|ذ\.م\.م\.?|م\.م\.ح\.?)\s*$"));

static EN_LEADING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^(?:the\s+company|company)(?:\s+|$)"));

static EN_TRAILING: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)[\s,]+(?:ltd|llc|inc|corp|co)\.?\s*$"));

fn trim_name(raw: &str) -> &str {
    raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '“' | '”' | '\'' | ',' | '،' | ';' | ':')
    })
}

/// Strip trailing suffixes until none is left ("Acme Co. Ltd." has two)
fn strip_trailing(name: &str, suffix: &Regex) -> String {
    let mut current = name.to_string();
    loop {
        let stripped = suffix.replace(&current, "").into_owned();
        if stripped == current || stripped.trim().is_empty() {
            return current;
        }
        current = stripped;
    }
}

/// Remove legal-entity decoration from a raw party name.
///
/// Arabic names lose a leading "شركة" and a trailing "المحدودة", "ذ.م.م"
/// or "م.م.ح"; Latin names lose a leading "The Company"/"Company" and
/// trailing "Ltd."/"LLC"/"Inc."/"Corp."/"Co." (case-insensitive).
/// Returns `None` when nothing meaningful is left.
pub fn clean_name(raw: &str) -> Option<String> {
    let name = trim_name(raw);

    let cleaned = if contains_arabic(name) {
        let without_lead = AR_LEADING.replace(name, "");
        strip_trailing(&without_lead, &AR_TRAILING)
    } else {
        let without_lead = EN_LEADING.replace(name, "");
        strip_trailing(&without_lead, &EN_TRAILING)
    };

    let cleaned = trim_name(&cleaned);
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("the") || cleaned == "شركة" {
        return None;
    }

    Some(cleaned.to_string())
}

/// Key used to compare party names across runs
pub fn comparison_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
