//! Utterance extraction.
//!
//! Pulls candidate products, coarse preferences (budget figure, intended use,
//! urgency), and checkout contact fields (email, phone, name) out of raw user
//! text with compiled-once regex sets and keyword buckets.

use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use ventas_backend::types::{CandidateProduct, Preferences, Priority, Urgency};

use crate::router::mentioned_products;

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

static BUDGET_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:presupuesto(?:\s+de)?|hasta|m[aá]ximo|menos\s+de|no\s+m[aá]s\s+de)\s*\$?\s*(\d{1,6}(?:[.,]\d{1,2})?)",
    )
    .unwrap()
});

static BUDGET_DOLLAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*(\d{1,6}(?:[.,]\d{1,2})?)").unwrap());

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s\-]{6,14}\d").unwrap());

// Keyword buckets for coarse preference extraction.

static USE_BUCKETS: &[(&str, &[&str])] = &[
    ("running", &["correr", "maratón", "maraton", "running", "trotar"]),
    ("gimnasio", &["gimnasio", "gym", "entrenar", "entrenamiento"]),
    ("casual", &["casual", "caminar", "diario", "ciudad", "pasear"]),
];

static URGENCY_HIGH: &[&str] = &["urgente", "ya mismo", "hoy", "rápido", "rapido", "apurado"];

static URGENCY_LOW: &[&str] = &[
    "sin apuro",
    "sin prisa",
    "tranquilo",
    "cuando se pueda",
    "no hay prisa",
];

// =============================================================================
// Candidates
// =============================================================================

/// Extract candidate products from an utterance.
///
/// Priority is assigned by order of first mention: first high, second
/// medium, the rest low.
pub fn extract_candidates(utterance: &str) -> Vec<CandidateProduct> {
    mentioned_products(utterance)
        .into_iter()
        .enumerate()
        .map(|(idx, entry)| CandidateProduct {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            priority: match idx {
                0 => Priority::Alta,
                1 => Priority::Media,
                _ => Priority::Baja,
            },
        })
        .collect()
}

// =============================================================================
// Preferences
// =============================================================================

/// Extract a budget figure, if any.
///
/// Context phrases ("presupuesto de 150", "hasta $120") win over a bare
/// dollar amount.
pub fn extract_budget(utterance: &str) -> Option<Decimal> {
    let captures = BUDGET_CONTEXT_RE
        .captures(utterance)
        .or_else(|| BUDGET_DOLLAR_RE.captures(utterance))?;
    let raw = captures.get(1)?.as_str().replace(',', ".");
    raw.parse().ok()
}

/// Bucket the intended use mentioned in the utterance.
pub fn extract_intended_use(utterance: &str) -> Option<String> {
    let lower = utterance.to_lowercase();
    for (bucket, keywords) in USE_BUCKETS {
        if keywords.iter().any(|k| lower.contains(k)) {
            return Some((*bucket).to_string());
        }
    }
    None
}

/// Bucket the urgency mentioned in the utterance. Defaults to medium.
pub fn extract_urgency(utterance: &str) -> Urgency {
    let lower = utterance.to_lowercase();
    // Low-urgency phrases first: "sin apuro" must not trip on "apurado".
    if URGENCY_LOW.iter().any(|k| lower.contains(k)) {
        return Urgency::Baja;
    }
    if URGENCY_HIGH.iter().any(|k| lower.contains(k)) {
        return Urgency::Alta;
    }
    Urgency::Media
}

/// Full preference extraction for the comparison request.
pub fn extract_preferences(utterance: &str) -> Preferences {
    Preferences {
        budget: extract_budget(utterance),
        intended_use: extract_intended_use(utterance),
        urgency: extract_urgency(utterance),
    }
}

// =============================================================================
// Checkout contact fields
// =============================================================================

/// First email address in the utterance, if any.
pub fn find_email(utterance: &str) -> Option<String> {
    EMAIL_RE.find(utterance).map(|m| m.as_str().to_string())
}

/// First phone-number-like digit run in the utterance, if any.
pub fn find_phone(utterance: &str) -> Option<String> {
    PHONE_RE.find(utterance).map(|m| m.as_str().to_string())
}

/// Whether the utterance is exactly the confirmation keyword
/// (case-insensitive, surrounding whitespace ignored).
pub fn is_confirmation(utterance: &str, keyword: &str) -> bool {
    utterance.trim().eq_ignore_ascii_case(keyword)
}
