//! Party extraction
//!
//! Finds the named legal entities in a contract. The labelled "parties"
//! section is preferred; when the document has none, company-name
//! patterns are scanned across the whole text. Every candidate then gets
//! a type, a registration number and contact details from the text around
//! its name.

mod attributes;
mod names;
mod roles;

pub use attributes::{
    find_contact_info, find_registration, ContactInfo, PartyWindow, EXTRACTION_WINDOW_CHARS,
};
pub use names::{clean_name, comparison_key};
pub use roles::{keyword_party_type, positional_party_type, TypeSource, PARTY_TYPE_KEYWORDS};

use crate::pattern::compile;
use crate::script::contains_arabic;
use contractiq_common::db::models::{PartyType, Registration};
use contractiq_common::db::NewParty;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Paragraphs taken as the party section, counting the keyword paragraph
const SECTION_PARAGRAPHS: usize = 4;

static SECTION_KEYWORDS_EN: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)\b(?:contracting\s+parties|parties|between)\b"));

static SECTION_KEYWORDS_AR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?:^|[\s:،(])(?:الأطراف\s+المتعاقدة|الأطراف|بين)(?:$|[\s:،)])")
});

static FIRST_PARTY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)(?:first\s+party|party\s+a\b|الطرف\s+الأول)\s*(?:\([^)]*\))?\s*[:：–-]\s*(.+)")
});

static SECOND_PARTY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)(?:second\s+party|party\s+b\b|الطرف\s+الثاني)\s*(?:\([^)]*\))?\s*[:：–-]\s*(.+)")
});

static COMPANY_EN: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b((?:[A-Z][A-Za-z0-9&'-]*[ \t]+){1,5}(?:Corporation|Company|Corp\.|Corp\b|Co\.|LLC\b|Ltd\.|Ltd\b|Inc\.|Inc\b))",
    )
});

static COMPANY_AR: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(شركة\s+[^\n،,.()]{1,60}?\s+(?:المحدودة|للتجارة|للمقاولات))")
});

/// Capitalised words that open a sentence rather than a company name
const LEADING_STOP_WORDS: &[&str] = &[
    "and", "between", "by", "first", "second", "party", "the", "this", "with", "supplier",
    "vendor", "client", "customer", "contractor", "partner", "buyer", "seller",
];

/// A party found in the text, before persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyCandidate {
    /// Name as captured from the document
    pub raw_name: String,
    /// Cleaned name, never empty
    pub name: String,
    pub name_ar: Option<String>,
    pub party_type: PartyType,
    pub type_source: TypeSource,
    pub registration: Option<Registration>,
    pub contact: ContactInfo,
}

impl PartyCandidate {
    /// Row to insert for this candidate, flagged for review
    pub fn to_new_party(&self, user_id: i32, contract_id: i32) -> NewParty {
        NewParty {
            user_id,
            name: self.name.clone(),
            name_ar: self.name_ar.clone(),
            party_type: self.party_type,
            registration: self.registration.clone(),
            email: self.contact.email.clone(),
            phone: self.contact.phone.clone(),
            address: self.contact.address.clone(),
            address_ar: self.contact.address_ar.clone(),
            source_contract_id: Some(contract_id),
            is_highlighted: true,
        }
    }
}

/// A name and type before attribute lookup
#[derive(Debug)]
struct RawParty {
    raw_name: String,
    party_type: PartyType,
    type_source: TypeSource,
}

fn split_paragraphs(text: &str) -> Vec<&str> {
    let mut paragraphs = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if line.trim().is_empty() {
            if let Some(s) = start.take() {
                paragraphs.push(text[s..offset].trim_end());
            }
        } else if start.is_none() {
            start = Some(offset);
        }
        offset += line.len();
    }
    if let Some(s) = start {
        paragraphs.push(text[s..].trim_end());
    }

    paragraphs
}

/// The first paragraph naming the parties plus the three after it
fn find_party_section(text: &str) -> Option<String> {
    let paragraphs = split_paragraphs(text);
    let index = paragraphs
        .iter()
        .position(|p| SECTION_KEYWORDS_EN.is_match(p) || SECTION_KEYWORDS_AR.is_match(p))?;
    let end = (index + SECTION_PARAGRAPHS).min(paragraphs.len());

    Some(paragraphs[index..end].join("\n\n"))
}

fn cut_label_name(value: &str) -> &str {
    let end = value
        .find(|c: char| matches!(c, ',' | '،' | '(' | ';' | '؛'))
        .unwrap_or(value.len());
    value[..end].trim()
}

fn push_unique(found: &mut Vec<RawParty>, party: RawParty) {
    if !found.iter().any(|p| p.raw_name == party.raw_name) {
        found.push(party);
    }
}

/// "First Party: X" / "Second Party: Y" lines inside the section
fn labelled_parties(section: &str) -> Vec<RawParty> {
    let mut found = Vec::new();

    for line in section.lines() {
        let (caps, position) = if let Some(caps) = FIRST_PARTY_LINE.captures(line) {
            (caps, 0)
        } else if let Some(caps) = SECOND_PARTY_LINE.captures(line) {
            (caps, 1)
        } else {
            continue;
        };

        let Some(value) = caps.get(1) else { continue };
        let raw_name = cut_label_name(value.as_str());
        if clean_name(raw_name).is_none() {
            continue;
        }

        let (party_type, type_source) = match keyword_party_type(line) {
            Some(party_type) => (party_type, TypeSource::Keyword),
            None => (positional_party_type(position), TypeSource::Position),
        };

        push_unique(
            &mut found,
            RawParty {
                raw_name: raw_name.to_string(),
                party_type,
                type_source,
            },
        );
    }

    found
}

/// Drop sentence-opening words captured ahead of a company name
fn strip_leading_stop_words(name: &str) -> Option<&str> {
    let mut rest = name.trim();
    loop {
        let (first, tail) = rest.split_once(char::is_whitespace)?;
        if !LEADING_STOP_WORDS.contains(&first.to_lowercase().as_str()) {
            return Some(rest);
        }
        rest = tail.trim_start();
    }
}

fn is_sentence_boundary(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '؟' | '\n')
}

/// Role keyword in the sentence around one mention, nearest text after
/// the name first
fn sentence_party_type(text: &str, start: usize, end: usize, others: &[&str]) -> Option<PartyType> {
    let sentence_start = text[..start]
        .char_indices()
        .rev()
        .find(|(_, c)| is_sentence_boundary(*c))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let sentence_end = text[end..]
        .find(is_sentence_boundary)
        .map(|i| end + i)
        .unwrap_or(text.len());

    let mut trailing = &text[end..sentence_end];
    for other in others {
        if let Some(pos) = trailing.find(other) {
            trailing = &trailing[..pos];
        }
    }

    keyword_party_type(trailing).or_else(|| keyword_party_type(&text[sentence_start..sentence_end]))
}

/// Whole-document scan for company names
fn company_name_parties(text: &str) -> Vec<RawParty> {
    let mut names: Vec<String> = Vec::new();

    for pattern in [&*COMPANY_EN, &*COMPANY_AR] {
        for m in pattern.find_iter(text) {
            let Some(name) = strip_leading_stop_words(m.as_str()) else {
                continue;
            };
            if clean_name(name).is_none() || names.iter().any(|n| n == name) {
                continue;
            }
            names.push(name.to_string());
        }
    }

    names
        .iter()
        .map(|name| {
            let others: Vec<&str> = names
                .iter()
                .filter(|n| *n != name)
                .map(String::as_str)
                .collect();
            let party_type = text
                .match_indices(name.as_str())
                .find_map(|(start, m)| sentence_party_type(text, start, start + m.len(), &others));

            match party_type {
                Some(party_type) => RawParty {
                    raw_name: name.clone(),
                    party_type,
                    type_source: TypeSource::Keyword,
                },
                None => RawParty {
                    raw_name: name.clone(),
                    party_type: PartyType::Vendor,
                    type_source: TypeSource::Default,
                },
            }
        })
        .collect()
}

fn build_candidate(text: &str, party: RawParty, others: &[&str]) -> Option<PartyCandidate> {
    let name = clean_name(&party.raw_name)?;

    // Attributes come from around the first mention only
    let (registration, contact) =
        match PartyWindow::first(text, &party.raw_name, EXTRACTION_WINDOW_CHARS, others) {
            Some(window) => (window.registration(), window.contact()),
            None => (None, ContactInfo::default()),
        };

    let name_ar = contains_arabic(&name).then(|| name.clone());

    Some(PartyCandidate {
        raw_name: party.raw_name,
        name,
        name_ar,
        party_type: party.party_type,
        type_source: party.type_source,
        registration,
        contact,
    })
}

/// Find every party named in a contract
pub fn extract_parties(text: &str) -> Vec<PartyCandidate> {
    let mut found = find_party_section(text)
        .map(|section| labelled_parties(&section))
        .unwrap_or_default();
    let from_section = !found.is_empty();

    if !from_section {
        found = company_name_parties(text);
    }

    let raw_names: Vec<String> = found.iter().map(|p| p.raw_name.clone()).collect();

    let candidates: Vec<PartyCandidate> = found
        .into_iter()
        .filter_map(|party| {
            let others: Vec<&str> = raw_names
                .iter()
                .filter(|n| **n != party.raw_name)
                .map(String::as_str)
                .collect();
            build_candidate(text, party, &others)
        })
        .collect();

    debug!(
        count = candidates.len(),
        from_section,
        "Parties extracted"
    );

    candidates
}
