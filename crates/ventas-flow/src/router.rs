//! Intent routing.
//!
//! Given a raw utterance and the current flow context, decides which mode
//! handles the turn. Precedence is an explicit ordered rule list evaluated
//! top-down, first match wins; the ordering is load-bearing: an active
//! comparison monopolizes routing, checkout comes next, then catalog
//! mentions, then free-form fallback.

use std::sync::LazyLock;

use regex::Regex;

/// Routing decision for one turn. Exactly one is returned per utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    ContinueComparison,
    ContinueCheckout,
    StartCheckout,
    StartComparison,
    FreeForm,
}

/// Flow context the router needs to decide.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteContext {
    pub comparison_active: bool,
    pub checkout_active: bool,
    pub cart_non_empty: bool,
}

/// A known product in the static catalog subset used for trigger matching.
#[derive(Debug)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
    /// Lowercase aliases matched against the lowercased utterance.
    pub aliases: &'static [&'static str],
}

/// Static catalog subset. Alias matching against this list is what turns a
/// free-form sentence into a comparison trigger.
pub static CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        id: "shoe-airmax90",
        name: "Nike Air Max 90",
        aliases: &["air max", "airmax"],
    },
    CatalogEntry {
        id: "shoe-airforce1",
        name: "Nike Air Force 1",
        aliases: &["air force", "airforce"],
    },
    CatalogEntry {
        id: "shoe-pegasus40",
        name: "Nike Pegasus 40",
        aliases: &["pegasus"],
    },
    CatalogEntry {
        id: "shoe-ultraboost",
        name: "Adidas Ultraboost Light",
        aliases: &["ultraboost", "ultra boost"],
    },
    CatalogEntry {
        id: "shoe-rsx",
        name: "Puma RS-X",
        aliases: &["rs-x", "rsx"],
    },
    CatalogEntry {
        id: "shoe-samba",
        name: "Adidas Samba",
        aliases: &["samba"],
    },
];

static CHECKOUT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    let mk = |pats: &[&str]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid checkout regex"))
            .collect()
    };
    mk(&[
        r"(?i)\bcomprar\b",
        r"(?i)\bpagar\b",
        r"(?i)\bcheckout\b",
        r"(?i)\bfinalizar\b",
        r"(?i)\bproceder\b",
        r"(?i)hacer\s+el\s+pedido",
        r"(?i)\bordenar\b",
    ])
});

/// Whether the utterance expresses a checkout intent.
pub fn matches_checkout_trigger(utterance: &str) -> bool {
    CHECKOUT_PATTERNS.iter().any(|re| re.is_match(utterance))
}

/// Catalog products mentioned in the utterance, ordered by first mention.
///
/// Each product appears once, at the byte offset of its earliest alias match.
pub fn mentioned_products(utterance: &str) -> Vec<&'static CatalogEntry> {
    let lower = utterance.to_lowercase();
    let mut hits: Vec<(usize, &'static CatalogEntry)> = Vec::new();

    for entry in CATALOG {
        let earliest = entry
            .aliases
            .iter()
            .filter_map(|alias| lower.find(alias))
            .min();
        if let Some(pos) = earliest {
            hits.push((pos, entry));
        }
    }

    hits.sort_by_key(|(pos, _)| *pos);
    hits.into_iter().map(|(_, entry)| entry).collect()
}

/// One named routing rule. Rules are pluggable: the router evaluates its
/// ordered list and takes the first decision.
pub trait RouteRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&self, utterance: &str, ctx: &RouteContext) -> Option<Intent>;
}

/// An active comparison flow monopolizes routing: a mid-negotiation "sí" or
/// "no" must never leak into checkout or free-form.
struct ComparisonMonopoly;

impl RouteRule for ComparisonMonopoly {
    fn name(&self) -> &'static str {
        "comparison_monopoly"
    }

    fn evaluate(&self, _utterance: &str, ctx: &RouteContext) -> Option<Intent> {
        ctx.comparison_active.then_some(Intent::ContinueComparison)
    }
}

struct ActiveCheckout;

impl RouteRule for ActiveCheckout {
    fn name(&self) -> &'static str {
        "active_checkout"
    }

    fn evaluate(&self, _utterance: &str, ctx: &RouteContext) -> Option<Intent> {
        ctx.checkout_active.then_some(Intent::ContinueCheckout)
    }
}

/// Checkout can only start with something to buy; the cart guard prevents an
/// impossible checkout.
struct CheckoutTrigger;

impl RouteRule for CheckoutTrigger {
    fn name(&self) -> &'static str {
        "checkout_trigger"
    }

    fn evaluate(&self, utterance: &str, ctx: &RouteContext) -> Option<Intent> {
        (ctx.cart_non_empty && matches_checkout_trigger(utterance))
            .then_some(Intent::StartCheckout)
    }
}

struct CatalogMention;

impl RouteRule for CatalogMention {
    fn name(&self) -> &'static str {
        "catalog_mention"
    }

    fn evaluate(&self, utterance: &str, _ctx: &RouteContext) -> Option<Intent> {
        (!mentioned_products(utterance).is_empty()).then_some(Intent::StartComparison)
    }
}

/// The router: an ordered rule list with a free-form fallback.
pub struct IntentRouter {
    rules: Vec<Box<dyn RouteRule>>,
}

impl IntentRouter {
    /// Build the router with the default precedence order.
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(ComparisonMonopoly),
                Box::new(ActiveCheckout),
                Box::new(CheckoutTrigger),
                Box::new(CatalogMention),
            ],
        }
    }

    /// Decide the intent for one utterance. First matching rule wins; later
    /// rules never override an earlier match.
    pub fn route(&self, utterance: &str, ctx: &RouteContext) -> Intent {
        for rule in &self.rules {
            if let Some(intent) = rule.evaluate(utterance, ctx) {
                tracing::debug!(rule = rule.name(), ?intent, "Routing decision");
                return intent;
            }
        }
        Intent::FreeForm
    }

    /// Rule names in evaluation order, for diagnostics.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Default for IntentRouter {
    fn default() -> Self {
        Self::new()
    }
}
