//! Compilation of the built-in rule tables

use regex_lite::Regex;

/// Compile a pattern from one of the static rule tables. Panics on an
/// invalid pattern; every table has a test that forces it.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}
