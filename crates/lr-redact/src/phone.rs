//! Phone number plausibility checking.
//!
//! Phone-shaped tokens are everywhere in database logs: order totals,
//! counters, timestamps. The `phone_numbers` pattern only masks a
//! candidate once a [`PhoneValidator`] accepts it. Verdicts are memoized
//! per normalized candidate for the lifetime of one engine.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Regions tried when a candidate carries no international prefix.
pub const DEFAULT_REGIONS: &[&str] = &["MY", "SG", "ID", "US", "GB", "IN", "AU"];

/// Which validator implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    /// Numbering-plan validation when compiled in, heuristic otherwise.
    #[default]
    Auto,
    /// Require the numbering-plan validator.
    NumberingPlan,
    /// Length and denylist heuristic only.
    Heuristic,
}

impl std::str::FromStr for ValidatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "auto" => Ok(ValidatorKind::Auto),
            "numbering_plan" | "precise" => Ok(ValidatorKind::NumberingPlan),
            "heuristic" | "fallback" => Ok(ValidatorKind::Heuristic),
            _ => Err(format!("unknown phone validator: {}", s)),
        }
    }
}

impl std::fmt::Display for ValidatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidatorKind::Auto => write!(f, "auto"),
            ValidatorKind::NumberingPlan => write!(f, "numbering_plan"),
            ValidatorKind::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Decides whether a normalized candidate is a plausible phone number.
pub trait PhoneValidator: Send {
    /// `normalized` has whitespace, hyphens, parentheses and dots removed.
    fn is_plausible(&self, normalized: &str) -> bool;

    /// Short identifier for summaries and logs.
    fn name(&self) -> &'static str;
}

/// Strip whitespace, hyphens, parentheses and dots.
pub fn normalize(candidate: &str) -> String {
    candidate
        .chars()
        .filter(|c| !(c.is_whitespace() || matches!(c, '-' | '(' | ')' | '.')))
        .collect()
}

/// Conservative validator used when no numbering-plan data is available.
///
/// Accepts 7 to 15 digits with an optional leading `+`, rejecting
/// degenerate runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicValidator;

impl HeuristicValidator {
    const MIN_DIGITS: usize = 7;
    const MAX_DIGITS: usize = 15;
}

impl PhoneValidator for HeuristicValidator {
    fn is_plausible(&self, normalized: &str) -> bool {
        let digits = normalized.strip_prefix('+').unwrap_or(normalized);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&digits.len()) {
            return false;
        }
        !is_degenerate(digits)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Digit strings that are never phone numbers.
fn is_degenerate(digits: &str) -> bool {
    let bytes = digits.as_bytes();
    // bare short numerics
    if bytes.len() <= 4 {
        return true;
    }
    // one digit repeated
    if bytes.iter().all(|b| *b == bytes[0]) {
        return true;
    }
    // zero/one filler such as 1000000 or 0101010
    bytes.iter().all(|b| matches!(b, b'0' | b'1'))
}

/// Numbering-plan validator backed by the `phonenumber` crate.
#[cfg(feature = "numbering-plan")]
#[derive(Debug, Clone)]
pub struct NumberingPlanValidator {
    regions: Vec<phonenumber::country::Id>,
}

#[cfg(feature = "numbering-plan")]
impl NumberingPlanValidator {
    /// Create a validator trying `regions` for numbers without `+`.
    ///
    /// Unknown region codes are skipped.
    pub fn new<S: AsRef<str>>(regions: &[S]) -> Self {
        let regions = regions
            .iter()
            .filter_map(|r| r.as_ref().to_uppercase().parse().ok())
            .collect();
        Self { regions }
    }
}

#[cfg(feature = "numbering-plan")]
impl PhoneValidator for NumberingPlanValidator {
    fn is_plausible(&self, normalized: &str) -> bool {
        if let Ok(number) = phonenumber::parse(None, normalized) {
            if phonenumber::is_valid(&number) {
                return true;
            }
        }
        self.regions.iter().any(|region| {
            phonenumber::parse(Some(*region), normalized)
                .map(|number| phonenumber::is_valid(&number))
                .unwrap_or(false)
        })
    }

    fn name(&self) -> &'static str {
        "numbering_plan"
    }
}

/// Construct the validator for `kind`.
///
/// Returns `None` when `kind` asks for numbering-plan validation but the
/// crate was built without the `numbering-plan` feature.
pub fn build_validator<S: AsRef<str>>(
    kind: ValidatorKind,
    regions: &[S],
) -> Option<Box<dyn PhoneValidator>> {
    match kind {
        ValidatorKind::Heuristic => Some(Box::new(HeuristicValidator)),
        #[cfg(feature = "numbering-plan")]
        ValidatorKind::Auto | ValidatorKind::NumberingPlan => {
            Some(Box::new(NumberingPlanValidator::new(regions)))
        }
        #[cfg(not(feature = "numbering-plan"))]
        ValidatorKind::Auto => {
            let _ = regions;
            Some(Box::new(HeuristicValidator))
        }
        #[cfg(not(feature = "numbering-plan"))]
        ValidatorKind::NumberingPlan => None,
    }
}

/// Memoized verdicts keyed by normalized candidate.
///
/// A key is never in both sets.
#[derive(Debug, Clone, Default)]
pub struct PhoneValidationCache {
    valid: HashSet<String>,
    invalid: HashSet<String>,
    hits: u64,
    misses: u64,
}

impl PhoneValidationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached verdict, counting the lookup as a hit or miss.
    pub fn lookup(&mut self, normalized: &str) -> Option<bool> {
        let verdict = if self.valid.contains(normalized) {
            Some(true)
        } else if self.invalid.contains(normalized) {
            Some(false)
        } else {
            None
        };
        match verdict {
            Some(_) => self.hits += 1,
            None => self.misses += 1,
        }
        verdict
    }

    /// Store a verdict.
    pub fn record(&mut self, normalized: String, plausible: bool) {
        if plausible {
            self.invalid.remove(&normalized);
            self.valid.insert(normalized);
        } else {
            self.valid.remove(&normalized);
            self.invalid.insert(normalized);
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn valid_len(&self) -> usize {
        self.valid.len()
    }

    pub fn invalid_len(&self) -> usize {
        self.invalid.len()
    }
}

/// A validator paired with its verdict cache.
pub struct CachedPhoneValidator {
    inner: Box<dyn PhoneValidator>,
    cache: PhoneValidationCache,
}

impl CachedPhoneValidator {
    pub fn new(inner: Box<dyn PhoneValidator>) -> Self {
        Self {
            inner,
            cache: PhoneValidationCache::new(),
        }
    }

    /// Normalize, consult the cache, validate on a miss, cache the verdict.
    pub fn is_plausible(&mut self, candidate: &str) -> bool {
        let normalized = normalize(candidate);
        if let Some(verdict) = self.cache.lookup(&normalized) {
            return verdict;
        }
        let verdict = !normalized.is_empty() && self.inner.is_plausible(&normalized);
        self.cache.record(normalized, verdict);
        verdict
    }

    pub fn validator_name(&self) -> &'static str {
        self.inner.name()
    }

    pub fn cache(&self) -> &PhoneValidationCache {
        &self.cache
    }
}

impl std::fmt::Debug for CachedPhoneValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedPhoneValidator")
            .field("validator", &self.inner.name())
            .field("cache", &self.cache)
            .finish()
    }
}
