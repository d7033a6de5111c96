//! Contract field extraction
//!
//! Every field is driven by an ordered rule table. Within a table the
//! first matching rule wins; tables are independent of each other, so
//! fields can be added or re-prioritised without touching control flow.
//! Absence of a match is a normal outcome and never an error.

use crate::pattern::compile;
use crate::script::{contains_arabic, normalize_digits};
use chrono::{DateTime, Utc};
use contractiq_common::db::NewContractDetails;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

/// Bumped whenever a rule table changes meaningfully
pub const RULE_VERSION: u32 = 1;

/// Coarse contract category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractType {
    Service,
    Nda,
    Employment,
    Sales,
    Other,
}

impl ContractType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractType::Service => "service",
            ContractType::Nda => "nda",
            ContractType::Employment => "employment",
            ContractType::Sales => "sales",
            ContractType::Other => "other",
        }
    }
}

/// Dominant script of the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    Arabic,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Arabic => "Arabic",
            Language::English => "English",
        }
    }
}

// ============================================================================
// Rule tables
// ============================================================================

/// One step of the contract type cascade, matched against lower-cased text
pub struct ContractTypeRule {
    pub contract_type: ContractType,
    pattern: Regex,
}

impl ContractTypeRule {
    fn new(contract_type: ContractType, pattern: &str) -> Self {
        Self {
            contract_type,
            pattern: compile(pattern),
        }
    }

    pub fn matches(&self, lowered: &str) -> bool {
        self.pattern.is_match(lowered)
    }
}

#[derive(Debug, Clone, Copy)]
enum Capture {
    /// Group 1, trimmed
    Text,
    /// Group 1 is a day count, rendered as "N days" with ASCII digits
    Days,
}

/// A pattern whose first capture group is the field value
pub struct CaptureRule {
    pattern: Regex,
    capture: Capture,
}

impl CaptureRule {
    fn text(pattern: &str) -> Self {
        Self {
            pattern: compile(pattern),
            capture: Capture::Text,
        }
    }

    fn days(pattern: &str) -> Self {
        Self {
            pattern: compile(pattern),
            capture: Capture::Days,
        }
    }

    pub fn apply(&self, text: &str) -> Option<String> {
        let raw = self.pattern.captures(text)?.get(1)?.as_str();
        let value = match self.capture {
            Capture::Text => trim_capture(raw).to_string(),
            Capture::Days => format!("{} days", normalize_digits(raw.trim())),
        };
        (!value.is_empty()).then_some(value)
    }
}

/// Service, NDA, employment, sales, then the catch-all
pub static CONTRACT_TYPE_RULES: LazyLock<Vec<ContractTypeRule>> = LazyLock::new(|| {
    vec![
        ContractTypeRule::new(
            ContractType::Service,
            r"services?\s+agreement|statement\s+of\s+work|scope\s+of\s+services|(?:عقد|اتفاقية)\s+(?:تقديم\s+)?(?:خدمات|الخدمات)",
        ),
        ContractTypeRule::new(
            ContractType::Nda,
            r"non-disclosure|nondisclosure|confidentiality\s+agreement|\bnda\b|عدم\s+(?:الإفصاح|إفشاء|الإفشاء)|اتفاقية\s+(?:سرية|السرية)",
        ),
        ContractTypeRule::new(
            ContractType::Employment,
            r"employment\s+(?:agreement|contract)|\bemployee\b|\bemployer\b|عقد\s+عمل|الموظف|صاحب\s+العمل",
        ),
        ContractTypeRule::new(
            ContractType::Sales,
            r"sales?\s+agreement|purchase\s+agreement|sale\s+of\s+goods|purchase\s+order|(?:عقد|اتفاقية)\s+(?:بيع|شراء)|البائع|المشتري",
        ),
        ContractTypeRule::new(ContractType::Other, r"(?s).*"),
    ]
});

static EXECUTED_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bexecuted\s+(?:on|this|as\s+of)\b",
        r"(?i)\bsigned\s+(?:on|this|by)\b",
        r"(?is)\bwitness\s+whereof\b.{0,300}?\bexecuted\b",
        r"(?i)\[\s*signed\s*\]",
        r"(?is)\bsignature\b.{0,100}?\bdate\b",
        r"تم\s+التوقيع",
        r"حرر\s+هذا\s+العقد",
        r"(?s)وقع.{0,60}?بتاريخ",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

static BETWEEN_EN: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?i)\bbetween\s+([^,(\n]+?)\s*(?:\([^)]*\)\s*)?,?\s+and\s+([^,(\n]+?)\s*(?:\(|,|;|\n|\.\s|\.?$)",
    )
});

static BETWEEN_AR: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?:^|\s)بين\s*:?\s*([^،,(\n]+?)\s*(?:\([^)]*\)\s*)?[،,]?\s+و\s*([^،,(\n]+?)\s*(?:\(|،|,|\n|\.\s|\.?$)",
    )
});

static FIRST_PART: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)([^,()\n]{2,100}?)\s*,?\s*\(?\s*(?:hereinafter\s+(?:referred\s+to\s+as\s+|called\s+)?)?(?:the\s+)?["“]?party\s+of\s+the\s+first\s+part"#,
    )
});

static SECOND_PART: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r#"(?i)([^,()\n]{2,100}?)\s*,?\s*\(?\s*(?:hereinafter\s+(?:referred\s+to\s+as\s+|called\s+)?)?(?:the\s+)?["“]?party\s+of\s+the\s+second\s+part"#,
    )
});

static FIRST_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?im)^\s*(?:\d+[.)]\s*)?(?:first\s+party|party\s+a\b|الطرف\s+الأول)\s*[:：–-]\s*([^\n]+)$")
});

static SECOND_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?im)^\s*(?:\d+[.)]\s*)?(?:second\s+party|party\s+b\b|الطرف\s+الثاني)\s*[:：–-]\s*([^\n]+)$")
});

static LEADING_CONNECTIVE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^.*\bbetween\s+|^(?:and|by)\s+"));

pub static GOVERNING_LAW_RULES: LazyLock<Vec<CaptureRule>> = LazyLock::new(|| {
    vec![
        CaptureRule::text(
            r"(?i)governed\s+by\s+(?:and\s+construed\s+in\s+accordance\s+with\s+)?(?:the\s+)?laws?\s+of\s+(?:the\s+)?(?:state\s+of\s+|commonwealth\s+of\s+)?([^,.;\n]+)",
        ),
        CaptureRule::text(
            r"(?i)under\s+the\s+laws?\s+of\s+(?:the\s+)?(?:state\s+of\s+|commonwealth\s+of\s+)?([^,.;\n]+)",
        ),
        CaptureRule::text(
            r"(?i:jurisdiction)[^.\n]{0,60}?\b(?i:of|in)\s+(?:(?i:the)\s+)?(?:(?i:state\s+of)\s+)?([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*)",
        ),
        CaptureRule::text(
            r"(?i:applicable\s+law)[^.\n]{0,60}?\b([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*)",
        ),
        CaptureRule::text(
            r"(?:يخضع|تخضع|يحكم|تحكم)[^.\n]{0,80}?(?:لأنظمة|لقوانين|لنظام|لقانون|للأنظمة|للقوانين|أنظمة|قوانين)\s+(?:المعمول\s+بها\s+)?(?:في\s+)?([^،,.\n]+)",
        ),
        CaptureRule::text(r"القانون\s+الواجب\s+التطبيق\s*[:：]?\s*(?:هو\s+)?([^،,.\n]+)"),
    ]
});

static GOVERNING_LAW_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"(?i)\s+(?:without|excluding|and\s+the|shall|as\s+applied)\b.*$")
});

pub static PAYMENT_TERM_RULES: LazyLock<Vec<CaptureRule>> = LazyLock::new(|| {
    vec![
        CaptureRule::text(r"(?i)payment\s+terms?\s*[:：]\s*([^\n.;]+)"),
        CaptureRule::text(r"(?i)\b(net\s*[0-9٠-٩]+)"),
        CaptureRule::text(
            r"(?i)payment[^.\n]{0,80}?\b(within\s+[0-9٠-٩]+\)?\s*(?:business\s+|calendar\s+)?days?)",
        ),
        CaptureRule::text(r"شروط\s+(?:الدفع|السداد)\s*[:：]\s*([^\n.؛]+)"),
        CaptureRule::text(r"(?:الدفع|السداد)[^.\n]{0,80}?(خلال\s+[0-9٠-٩]+\s*(?:يوماً|يوما|يوم|أيام))"),
    ]
});

pub static BREACH_NOTICE_RULES: LazyLock<Vec<CaptureRule>> = LazyLock::new(|| {
    vec![
        CaptureRule::days(
            r"(?is)\bbreach\b.{0,200}?([0-9٠-٩]+)\)?\s*(?:\([a-z\s-]+\)\s*)?(?:business\s+|calendar\s+)?days?['’]?\s+(?:prior\s+)?(?:written\s+)?notice",
        ),
        CaptureRule::days(
            r"(?is)\bnotice\s+of\s+(?:any\s+)?breach.{0,150}?within\s+([0-9٠-٩]+)\)?\s*(?:\([a-z\s-]+\)\s*)?(?:business\s+|calendar\s+)?days?",
        ),
        CaptureRule::days(
            r"(?is)\bcure\b.{0,100}?within\s+([0-9٠-٩]+)\)?\s*(?:\([a-z\s-]+\)\s*)?(?:business\s+|calendar\s+)?days?",
        ),
        CaptureRule::days(r"(?s)(?:الإخلال|إخلال|الاخلال|اخلال).{0,200}?([0-9٠-٩]+)\s*(?:يوماً|يوما|يوم|أيام)"),
    ]
});

pub static TERMINATION_NOTICE_RULES: LazyLock<Vec<CaptureRule>> = LazyLock::new(|| {
    vec![
        CaptureRule::days(
            r"(?is)\bterminat\w*.{0,200}?([0-9٠-٩]+)\)?\s*(?:\([a-z\s-]+\)\s*)?(?:business\s+|calendar\s+)?days?['’]?\s+(?:prior\s+)?(?:written\s+)?notice",
        ),
        CaptureRule::days(
            r"(?is)([0-9٠-٩]+)\)?\s*(?:\([a-z\s-]+\)\s*)?(?:business\s+|calendar\s+)?days?['’]?\s+(?:prior\s+)?(?:written\s+)?notice\s+of\s+terminat",
        ),
        CaptureRule::days(r"(?s)(?:إنهاء|انهاء|فسخ).{0,200}?([0-9٠-٩]+)\s*(?:يوماً|يوما|يوم|أيام)"),
    ]
});

// ============================================================================
// Field extractors
// ============================================================================

fn trim_capture(raw: &str) -> &str {
    raw.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '“' | '”' | '\'' | ',' | '،' | ';' | '؛' | ':')
    })
}

fn first_capture(rules: &[CaptureRule], text: &str) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(text))
}

/// Classify the contract; never fails thanks to the catch-all rule
pub fn extract_contract_type(text: &str) -> ContractType {
    let lowered = text.to_lowercase();
    CONTRACT_TYPE_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.contract_type)
        .unwrap_or(ContractType::Other)
}

/// Whether any signature or execution phrasing is present
pub fn detect_executed(text: &str) -> bool {
    EXECUTED_PATTERNS.iter().any(|p| p.is_match(text))
}

/// Any Arabic-script character makes the document Arabic
pub fn detect_language(text: &str) -> Language {
    if contains_arabic(text) {
        Language::Arabic
    } else {
        Language::English
    }
}

fn push_unique(list: &mut Vec<String>, raw: &str) {
    let cleaned = LEADING_CONNECTIVE.replace(trim_capture(raw), "");
    let name = trim_capture(&cleaned);

    if name.is_empty() || name.chars().count() > 120 || is_generic_party_phrase(name) {
        return;
    }
    if !list.iter().any(|existing| existing == name) {
        list.push(name.to_string());
    }
}

fn is_generic_party_phrase(name: &str) -> bool {
    let lowered = name.to_lowercase();
    matches!(
        lowered.as_str(),
        "the parties" | "the party" | "them" | "us" | "you" | "the parties hereto" | "الطرفين" | "الأطراف"
    )
}

/// Cut a labelled name at the first clause separator
fn label_name(value: &str) -> &str {
    let end = value
        .find(|c: char| matches!(c, ',' | '،' | '(' | ';' | '؛'))
        .unwrap_or(value.len());
    &value[..end]
}

/// First-party and second-party names, in order of appearance per pattern
pub fn extract_party_names(text: &str) -> (Vec<String>, Vec<String>) {
    let mut internal = Vec::new();
    let mut counter = Vec::new();

    for pattern in [&*BETWEEN_EN, &*BETWEEN_AR] {
        for caps in pattern.captures_iter(text) {
            if let (Some(first), Some(second)) = (caps.get(1), caps.get(2)) {
                push_unique(&mut internal, first.as_str());
                push_unique(&mut counter, second.as_str());
            }
        }
    }

    for caps in FIRST_PART.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push_unique(&mut internal, m.as_str());
        }
    }
    for caps in SECOND_PART.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push_unique(&mut counter, m.as_str());
        }
    }

    for caps in FIRST_LABEL.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push_unique(&mut internal, label_name(m.as_str()));
        }
    }
    for caps in SECOND_LABEL.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push_unique(&mut counter, label_name(m.as_str()));
        }
    }

    (internal, counter)
}

pub fn extract_governing_law(text: &str) -> Option<String> {
    let raw = first_capture(&GOVERNING_LAW_RULES, text)?;
    let law = GOVERNING_LAW_TAIL.replace(&raw, "");
    let law = trim_capture(&law);
    (!law.is_empty()).then(|| law.to_string())
}

pub fn extract_payment_term(text: &str) -> Option<String> {
    first_capture(&PAYMENT_TERM_RULES, text)
}

pub fn extract_breach_notice(text: &str) -> Option<String> {
    first_capture(&BREACH_NOTICE_RULES, text)
}

pub fn extract_termination_notice(text: &str) -> Option<String> {
    first_capture(&TERMINATION_NOTICE_RULES, text)
}

// ============================================================================
// Bundle
// ============================================================================

/// Everything the field engine knows about one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBundle {
    pub contract_type: ContractType,
    pub executed_status: bool,
    pub language: Language,
    pub internal_parties: Vec<String>,
    pub counterparties: Vec<String>,
    pub governing_law: Option<String>,
    pub payment_term: Option<String>,
    pub breach_notice: Option<String>,
    pub termination_notice: Option<String>,
}

impl FieldBundle {
    /// JSON blob stored alongside the details row
    pub fn extraction_metadata(&self, extracted_at: DateTime<Utc>) -> serde_json::Value {
        serde_json::json!({
            "extractedAt": extracted_at.to_rfc3339(),
            "contractType": self.contract_type.as_str(),
            "language": self.language.as_str(),
            "ruleVersion": RULE_VERSION,
        })
    }

    pub fn to_contract_details(
        &self,
        contract_id: i32,
        extracted_text: String,
        extracted_at: DateTime<Utc>,
    ) -> NewContractDetails {
        NewContractDetails {
            contract_id,
            executed_status: self.executed_status,
            language: self.language.as_str().to_string(),
            internal_parties: self.internal_parties.clone(),
            counterparties: self.counterparties.clone(),
            governing_law: self.governing_law.clone(),
            payment_term: self.payment_term.clone(),
            breach_notice: self.breach_notice.clone(),
            termination_notice: self.termination_notice.clone(),
            extracted_text,
            extraction_metadata: self.extraction_metadata(extracted_at),
        }
    }
}

/// Run every field extractor over the document text
pub fn extract_fields(text: &str) -> FieldBundle {
    let (internal_parties, counterparties) = extract_party_names(text);

    let bundle = FieldBundle {
        contract_type: extract_contract_type(text),
        executed_status: detect_executed(text),
        language: detect_language(text),
        internal_parties,
        counterparties,
        governing_law: extract_governing_law(text),
        payment_term: extract_payment_term(text),
        breach_notice: extract_breach_notice(text),
        termination_notice: extract_termination_notice(text),
    };

    debug!(
        contract_type = bundle.contract_type.as_str(),
        language = bundle.language.as_str(),
        executed = bundle.executed_status,
        internal = bundle.internal_parties.len(),
        counter = bundle.counterparties.len(),
        "Fields extracted"
    );

    bundle
}
