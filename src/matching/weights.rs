//! Scoring weights and thresholds, pinned in one place.
//!
//! All confidence arithmetic uses `BigDecimal` so scores are identical
//! across platforms. Each function builds its constant from exact integer
//! ratios; callers must not introduce floating point anywhere in a score.

use bigdecimal::BigDecimal;

fn percent(value: i64) -> BigDecimal {
    BigDecimal::from(value) / BigDecimal::from(100)
}

/// Ceiling for any combined confidence score
pub fn confidence_cap() -> BigDecimal {
    BigDecimal::from(1)
}

/// Results below this confidence are discarded entirely
pub fn min_confidence() -> BigDecimal {
    percent(30)
}

// Single-source fuzzy search -------------------------------------------------

/// Value similarity contributes up to 0.40
pub fn value_weight() -> BigDecimal {
    percent(40)
}

/// Text similarity contributes up to 0.20
pub fn text_weight() -> BigDecimal {
    percent(20)
}

/// Tier bonus for an exact-value hit
pub fn exact_tier_bonus() -> BigDecimal {
    percent(30)
}

/// Tier bonus for a close-value hit
pub fn close_tier_bonus() -> BigDecimal {
    percent(15)
}

/// Tier bonus for a fuzzy hit
pub fn fuzzy_tier_bonus() -> BigDecimal {
    percent(5)
}

/// Bonus when the record's date matches the queried date
pub fn date_weight() -> BigDecimal {
    percent(5)
}

/// Bonus for an exact identifier hit in fuzzy search
pub fn identifier_weight() -> BigDecimal {
    percent(10)
}

/// Bonus for a partial (masked) identifier hit in fuzzy search
pub fn identifier_partial_weight() -> BigDecimal {
    percent(5)
}

// Cross-source reconciliation -------------------------------------------------

/// Value proximity contributes up to 0.40
pub fn recon_value_weight() -> BigDecimal {
    percent(40)
}

/// Identical calendar dates
pub fn recon_date_exact() -> BigDecimal {
    percent(30)
}

/// Dates at most one day apart
pub fn recon_date_near() -> BigDecimal {
    percent(15)
}

/// Identical canonical identifiers
pub fn recon_identifier_exact() -> BigDecimal {
    percent(20)
}

/// Partial identifier overlap (masked identifiers)
pub fn recon_identifier_partial() -> BigDecimal {
    percent(10)
}

/// Free-text similarity above [`text_similarity_floor`]
pub fn recon_text_weight() -> BigDecimal {
    percent(10)
}

/// Text similarity must exceed this before it contributes
pub fn text_similarity_floor() -> BigDecimal {
    percent(70)
}

/// Each satisfied custom-rule condition adds this much
pub fn rule_condition_bonus() -> BigDecimal {
    percent(5)
}

/// Minimum shared digit run for a partial identifier hit
pub const IDENTIFIER_PARTIAL_RUN: usize = 6;

// Classification and reporting bands ------------------------------------------

/// Confidence above which a match is promoted to exact
pub fn exact_threshold() -> BigDecimal {
    percent(95)
}

/// Confidence above which a match is promoted to approximate
pub fn approximate_threshold() -> BigDecimal {
    percent(80)
}

/// Histogram band: high confidence
pub fn histogram_high() -> BigDecimal {
    percent(90)
}

/// Histogram band: medium confidence
pub fn histogram_medium() -> BigDecimal {
    percent(70)
}
