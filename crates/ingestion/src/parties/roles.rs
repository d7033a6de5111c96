//! Party type indicators

use contractiq_common::db::models::PartyType;
use serde::{Deserialize, Serialize};

/// How a candidate's type was decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeSource {
    /// A role keyword appeared next to the name
    Keyword,
    /// First/second party position; low confidence
    Position,
    /// Nothing indicated a role
    Default,
}

/// Role keywords per party type, both languages, lower-case
pub const PARTY_TYPE_KEYWORDS: &[(PartyType, &[&str])] = &[
    (
        PartyType::Vendor,
        &[
            "vendor",
            "supplier",
            "seller",
            "service provider",
            "lessor",
            "المورد",
            "البائع",
            "مقدم الخدمة",
            "مقدم الخدمات",
            "المؤجر",
        ],
    ),
    (
        PartyType::Client,
        &[
            "client",
            "customer",
            "buyer",
            "purchaser",
            "lessee",
            "العميل",
            "المشتري",
            "المستأجر",
        ],
    ),
    (PartyType::Partner, &["partner", "الشريك"]),
    (PartyType::Contractor, &["contractor", "المقاول"]),
];

/// Type named by the earliest role keyword in `text`
pub fn keyword_party_type(text: &str) -> Option<PartyType> {
    let lowered = text.to_lowercase();

    PARTY_TYPE_KEYWORDS
        .iter()
        .flat_map(|(party_type, keywords)| {
            keywords
                .iter()
                .filter_map(|keyword| lowered.find(keyword).map(|pos| (pos, *party_type)))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, party_type)| party_type)
}

/// First party is assumed to be the vendor, second the client
pub fn positional_party_type(position: usize) -> PartyType {
    match position {
        0 => PartyType::Vendor,
        _ => PartyType::Client,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_match_both_languages() {
        assert_eq!(keyword_party_type("Beta LLC (the \"Customer\")"), Some(PartyType::Client));
        assert_eq!(keyword_party_type("شركة البناء (المقاول)"), Some(PartyType::Contractor));
        assert_eq!(keyword_party_type("Gamma, our trusted Partner"), Some(PartyType::Partner));
        assert_eq!(keyword_party_type("Acme Corp."), None);
    }

    #[test]
    fn test_earliest_keyword_wins() {
        let line = "First Party: Acme (the Contractor), who provides works to the Client";
        assert_eq!(keyword_party_type(line), Some(PartyType::Contractor));
    }

    #[test]
    fn test_positional_fallback() {
        assert_eq!(positional_party_type(0), PartyType::Vendor);
        assert_eq!(positional_party_type(1), PartyType::Client);
    }
}
