//! Registration numbers and contact details near a party name

use crate::pattern::compile;
use crate::script::normalize_digits;
use contractiq_common::db::models::{Registration, RegistrationType};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Characters searched on each side of a party name
pub const EXTRACTION_WINDOW_CHARS: usize = 500;

/// Label patterns per registration kind, matched on ASCII-digit text.
/// Table order is the priority order.
static REGISTRATION_RULES: LazyLock<Vec<(RegistrationType, Regex)>> = LazyLock::new(|| {
    vec![
        (
            RegistrationType::Cr,
            compile(r"(?i)(?:commercial\s+reg(?:istration|\.)?|\bC\.?R\.?)\s*(?:no\.?|number|#)?\s*[:：]?\s*(\d{5,15})"),
        ),
        (
            RegistrationType::Cr,
            compile(r"(?:السجل\s+التجاري|سجل\s+تجاري)\s*(?:رقم)?\s*[:：]?\s*(?:رقم\s*)?(\d{5,15})"),
        ),
        (
            RegistrationType::Vat,
            compile(r"(?i)(?:\bVAT|\btax)\s*(?:registration\s*)?(?:no\.?|number|id|#)?\s*[:：]?\s*(\d{9,15})"),
        ),
        (
            RegistrationType::Vat,
            compile(r"(?:الرقم\s+الضريبي|رقم\s+ضريبي|ضريبة\s+القيمة\s+المضافة)\s*(?:رقم)?\s*[:：]?\s*(\d{9,15})"),
        ),
        (
            RegistrationType::NationalId,
            compile(r"(?i)(?:national\s+id(?:entity)?(?:\s+card)?|\bid\s+(?:no\.?|number)|\biqama)\s*(?:no\.?|number|#)?\s*[:：]?\s*(\d{10})"),
        ),
        (
            RegistrationType::NationalId,
            compile(r"(?:الهوية\s+الوطنية|رقم\s+الهوية|هوية\s+وطنية|الإقامة)\s*(?:رقم)?\s*[:：]?\s*(\d{10})"),
        ),
    ]
});

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}"));

/// +966 / 966 / 00966 / 0 prefix, then a 5 and eight digits
static PHONE_SA: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?:^|[^0-9+])((?:\+966|00966|966|0)?\s?5\d{8})(?:[^0-9]|$)"));

static PHONE_US: LazyLock<Regex> = LazyLock::new(|| compile(r"(\(\d{3}\)\s?\d{3}-\d{4})"));

static ADDRESS_EN: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\baddress\s*[:：]\s*([^\n]+)",
        r"(?i)\blocated\s+at\s*[:：]?\s*([^\n]+)",
        r"(?i)\b(P\.?\s?O\.?\s*Box\s*[:：]?\s*[0-9٠-٩]+[^\n]*)",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

static ADDRESS_AR: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"العنوان\s*[:：]\s*([^\n]+)",
        r"(ص\.\s?ب\.?\s*[:：]?\s*[0-9٠-٩]+[^\n]*)",
    ]
    .into_iter()
    .map(compile)
    .collect()
});

/// Contact labels that end an address on the same line
static ADDRESS_TAIL: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\s*[,;|،]?\s*(?:\b(?i:tel|phone|mobile|fax|e-?mail|cr|vat)\b|هاتف|جوال|البريد|سجل|الرقم\s+الضريبي).*$")
});

const MAX_ADDRESS_CHARS: usize = 200;

/// Best-effort contact details for one party
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub address_ar: Option<String>,
}

/// Byte offset `n` characters before `idx`, clamped to the start
fn chars_back(text: &str, idx: usize, n: usize) -> usize {
    text[..idx]
        .char_indices()
        .rev()
        .take(n)
        .last()
        .map(|(i, _)| i)
        .unwrap_or(idx)
}

/// Byte offset `n` characters after `idx`, clamped to the end
fn chars_forward(text: &str, idx: usize, n: usize) -> usize {
    text[idx..]
        .char_indices()
        .nth(n)
        .map(|(i, _)| idx + i)
        .unwrap_or(text.len())
}

/// Text on either side of one occurrence of a party name.
///
/// `after` starts at the name itself and stops at the next mention of
/// another party. When another party is mentioned before the name, the
/// text in between follows that party's name and belongs to it, so
/// `before` is left empty.
#[derive(Debug, Clone, Copy)]
pub struct PartyWindow<'a> {
    pub before: &'a str,
    pub after: &'a str,
}

impl<'a> PartyWindow<'a> {
    /// Window around the name occurrence starting at byte `start`
    pub fn at(text: &'a str, start: usize, name: &str, radius: usize, others: &[&str]) -> Self {
        let name_end = start + name.len();
        let begin = chars_back(text, start, radius);
        let end = chars_forward(text, name_end, radius);

        let mut before = &text[begin..start];
        let mut after = &text[start..end];

        for other in others
            .iter()
            .filter(|other| !other.is_empty() && !name.contains(**other))
        {
            if let Some(pos) = after[name.len()..].find(other) {
                after = &after[..name.len() + pos];
            }
            if before.contains(*other) {
                before = "";
            }
        }

        Self { before, after }
    }

    /// Window around the first occurrence of `name`
    pub fn first(text: &'a str, name: &str, radius: usize, others: &[&str]) -> Option<Self> {
        if name.is_empty() {
            return None;
        }
        let start = text.find(name)?;
        Some(Self::at(text, start, name, radius, others))
    }

    fn segments(&self) -> [&'a str; 2] {
        [self.after, self.before]
    }

    /// CR, then VAT, then national ID; text after the name is searched first
    pub fn registration(&self) -> Option<Registration> {
        let segments = self.segments().map(normalize_digits);

        REGISTRATION_RULES.iter().find_map(|(kind, pattern)| {
            segments.iter().find_map(|segment| {
                let number = pattern.captures(segment)?.get(1)?.as_str().to_string();
                Some(Registration {
                    number,
                    kind: *kind,
                })
            })
        })
    }

    pub fn contact(&self) -> ContactInfo {
        let segments = self.segments();
        let ascii = segments.map(normalize_digits);

        let email = segments
            .iter()
            .find_map(|s| EMAIL.find(s).map(|m| m.as_str().to_string()));

        let phone = ascii.iter().find_map(|s| {
            PHONE_SA
                .captures(s)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().split_whitespace().collect::<String>())
                .or_else(|| PHONE_US.find(s).map(|m| m.as_str().to_string()))
        });

        ContactInfo {
            email,
            phone,
            address: first_address(&ADDRESS_EN, &segments),
            address_ar: first_address(&ADDRESS_AR, &segments),
        }
    }
}

fn first_address(rules: &[Regex], segments: &[&str]) -> Option<String> {
    segments.iter().find_map(|segment| {
        rules.iter().find_map(|rule| {
            rule.captures_iter(segment)
                .filter_map(|c| c.get(1))
                .map(|m| clean_address(m.as_str()))
                .find(|address| !address.is_empty() && !address.contains('@'))
        })
    })
}

fn clean_address(raw: &str) -> String {
    let cut = ADDRESS_TAIL.replace(raw, "");
    let trimmed: String = cut.chars().take(MAX_ADDRESS_CHARS).collect();
    trimmed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '،' | ';' | '.'))
        .to_string()
}

/// Registration number near the first occurrence of `name`
pub fn find_registration(text: &str, name: &str) -> Option<Registration> {
    PartyWindow::first(text, name, EXTRACTION_WINDOW_CHARS, &[])?.registration()
}

/// Contact details near the first occurrence of `name`
pub fn find_contact_info(text: &str, name: &str) -> ContactInfo {
    PartyWindow::first(text, name, EXTRACTION_WINDOW_CHARS, &[])
        .map(|window| window.contact())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commercial_registration_label() {
        let text = "... Supplier XYZ LLC, Commercial Registration: 1234567890 ...";
        assert_eq!(
            find_registration(text, "XYZ LLC"),
            Some(Registration {
                number: "1234567890".to_string(),
                kind: RegistrationType::Cr,
            })
        );
    }

    #[test]
    fn test_arabic_label_and_digits() {
        let text = "الطرف الأول: شركة الأمل المحدودة، سجل تجاري رقم: ١٠١٠١٢٣٤٥٦";
        let reg = find_registration(text, "شركة الأمل المحدودة").unwrap();
        assert_eq!(reg.number, "1010123456");
        assert_eq!(reg.kind, RegistrationType::Cr);
    }

    #[test]
    fn test_cr_outranks_vat() {
        let text = "Gamma Ltd, VAT No: 300123456700003, CR: 1010999888";
        let reg = find_registration(text, "Gamma Ltd").unwrap();
        assert_eq!(reg.kind, RegistrationType::Cr);
        assert_eq!(reg.number, "1010999888");

        let vat_only = "Gamma Ltd, VAT No: 300123456700003";
        let reg = find_registration(vat_only, "Gamma Ltd").unwrap();
        assert_eq!(reg.kind, RegistrationType::Vat);
    }

    #[test]
    fn test_national_id() {
        let text = "Second Party: Omar Saleh, National ID: 1098765432";
        let reg = find_registration(text, "Omar Saleh").unwrap();
        assert_eq!(reg.kind, RegistrationType::NationalId);
        assert_eq!(reg.number, "1098765432");
    }

    #[test]
    fn test_contact_details_in_window() {
        let text = "First Party: Acme Trading Company, Email: legal@acme.sa, \
            Phone: +966 551234567\nAddress: King Fahd Road, Riyadh, Tel: 0112345678";
        let contact = find_contact_info(text, "Acme Trading Company");
        assert_eq!(contact.email.as_deref(), Some("legal@acme.sa"));
        assert_eq!(contact.phone.as_deref(), Some("+966551234567"));
        assert_eq!(contact.address.as_deref(), Some("King Fahd Road, Riyadh"));
        assert_eq!(contact.address_ar, None);
    }

    #[test]
    fn test_arabic_address_and_us_phone() {
        let text = "شركة النور للتجارة، العنوان: الرياض، حي العليا\nContact (212) 555-0187";
        let contact = find_contact_info(text, "شركة النور للتجارة");
        assert_eq!(contact.address_ar.as_deref(), Some("الرياض، حي العليا"));
        assert!(crate::script::contains_arabic(contact.address_ar.as_deref().unwrap()));
        assert_eq!(contact.phone.as_deref(), Some("(212) 555-0187"));
    }

    #[test]
    fn test_far_email_not_attributed() {
        let filler = "lorem ipsum ".repeat(100);
        let text = format!("Acme Trading LLC agrees as follows. {filler} Contact: far@away.com");
        assert!(text.find("far@away.com").unwrap() > 1000);

        let contact = find_contact_info(&text, "Acme Trading LLC");
        assert_eq!(contact.email, None);

        let near = format!("Acme Trading LLC, Email: near@acme.com. {filler}");
        assert_eq!(
            find_contact_info(&near, "Acme Trading LLC").email.as_deref(),
            Some("near@acme.com")
        );
    }

    #[test]
    fn test_window_counts_characters_not_bytes() {
        // Each Arabic letter is two bytes; the window must stay on char boundaries
        let filler = "ب".repeat(800);
        let text = format!("{filler}Acme Co.{filler}");
        let window = PartyWindow::first(&text, "Acme Co.", EXTRACTION_WINDOW_CHARS, &[]).unwrap();
        assert_eq!(window.before.chars().count(), EXTRACTION_WINDOW_CHARS);
        assert_eq!(window.after.chars().count(), "Acme Co.".len() + EXTRACTION_WINDOW_CHARS);
    }

    #[test]
    fn test_window_stops_at_other_party() {
        let text = "First Party: Acme Co., Email: a@acme.com\nSecond Party: Beta LLC, Phone: 0551234567";
        let window = PartyWindow::first(text, "Acme Co.", EXTRACTION_WINDOW_CHARS, &["Beta LLC"])
            .unwrap();
        let contact = window.contact();
        assert_eq!(contact.email.as_deref(), Some("a@acme.com"));
        assert_eq!(contact.phone, None);

        let window = PartyWindow::first(text, "Beta LLC", EXTRACTION_WINDOW_CHARS, &["Acme Co."])
            .unwrap();
        assert!(window.before.is_empty());
        let contact = window.contact();
        assert_eq!(contact.email, None);
        assert_eq!(contact.phone.as_deref(), Some("0551234567"));
    }

    #[test]
    fn test_arabic_vat_and_national_id_labels() {
        let vat = "شركة الأمل المحدودة، الرقم الضريبي: ٣٠٠١٢٣٤٥٦٧٠٠٠٠٣";
        let reg = find_registration(vat, "شركة الأمل المحدودة").unwrap();
        assert_eq!(reg.kind, RegistrationType::Vat);
        assert_eq!(reg.number, "300123456700003");

        let national_id = "الطرف الثاني: سالم العتيبي، الهوية الوطنية: 1098765432";
        let reg = find_registration(national_id, "سالم العتيبي").unwrap();
        assert_eq!(reg.kind, RegistrationType::NationalId);
        assert_eq!(reg.number, "1098765432");
    }

    #[test]
    fn test_located_at_and_po_box_addresses() {
        let located = "Orbit Ltd is located at: 12 Olaya Street, Riyadh";
        assert_eq!(
            find_contact_info(located, "Orbit Ltd").address.as_deref(),
            Some("12 Olaya Street, Riyadh")
        );

        let po_box = "Orbit Ltd, P.O. Box: 4455 Jeddah";
        assert_eq!(
            find_contact_info(po_box, "Orbit Ltd").address.as_deref(),
            Some("P.O. Box: 4455 Jeddah")
        );

        let ar_box = "شركة النور للتجارة، ص.ب ١٢٣٤ الدمام";
        let contact = find_contact_info(ar_box, "شركة النور للتجارة");
        assert_eq!(contact.address_ar.as_deref(), Some("ص.ب ١٢٣٤ الدمام"));
        assert_eq!(contact.address, None);
    }

    #[test]
    fn test_saudi_phone_prefixes() {
        let country_code = "Orbit Ltd, Phone: 966551234567";
        assert_eq!(
            find_contact_info(country_code, "Orbit Ltd").phone.as_deref(),
            Some("966551234567")
        );

        let bare = "Orbit Ltd, Mobile 551234567";
        assert_eq!(
            find_contact_info(bare, "Orbit Ltd").phone.as_deref(),
            Some("551234567")
        );

        let arabic_digits = "شركة النور للتجارة، جوال: ٠٥٥١٢٣٤٥٦٧";
        assert_eq!(
            find_contact_info(arabic_digits, "شركة النور للتجارة").phone.as_deref(),
            Some("0551234567")
        );
    }
}
