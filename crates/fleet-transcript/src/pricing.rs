//! Per-model USD-per-million-token rates. Pure lookup plus cost
//! arithmetic; unknown models contribute zero cost (tokens are still
//! counted in full by the enricher).

use crate::schemas::Usage;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelRate {
    pub input: f64,
    pub output: f64,
    pub cache_write: f64,
    pub cache_read: f64,
}

/// Model id prefix -> USD/MTok rates. Matched by longest prefix so a
/// dated model id (`claude-3-5-sonnet-20241022`) resolves to its family.
const RATES: &[(&str, ModelRate)] = &[
    (
        "claude-3-5-sonnet",
        ModelRate {
            input: 3.0,
            output: 15.0,
            cache_write: 3.75,
            cache_read: 0.30,
        },
    ),
    (
        "claude-3-5-haiku",
        ModelRate {
            input: 0.80,
            output: 4.0,
            cache_write: 1.0,
            cache_read: 0.08,
        },
    ),
    (
        "claude-3-opus",
        ModelRate {
            input: 15.0,
            output: 75.0,
            cache_write: 18.75,
            cache_read: 1.50,
        },
    ),
    (
        "claude-3-haiku",
        ModelRate {
            input: 0.25,
            output: 1.25,
            cache_write: 0.30,
            cache_read: 0.03,
        },
    ),
    (
        "claude-3-sonnet",
        ModelRate {
            input: 3.0,
            output: 15.0,
            cache_write: 3.75,
            cache_read: 0.30,
        },
    ),
];

/// Look up the rate table entry for `model` by longest matching prefix.
/// Unknown models yield all-zero rates.
pub fn rate_for(model: &str) -> ModelRate {
    RATES
        .iter()
        .filter(|(prefix, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _)| prefix.len())
        .map(|(_, rate)| *rate)
        .unwrap_or_default()
}

/// Cost in USD of one response's usage under the named model's rates.
/// `model = None` (or unrecognized) contributes 0.
pub fn cost(usage: &Usage, model: Option<&str>) -> f64 {
    let rate = model.map(rate_for).unwrap_or_default();
    let mtok = 1_000_000.0;
    usage.input_tokens as f64 / mtok * rate.input
        + usage.output_tokens as f64 / mtok * rate.output
        + usage.cache_creation_input_tokens as f64 / mtok * rate.cache_write
        + usage.cache_read_input_tokens as f64 / mtok * rate.cache_read
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_model_is_zero_cost() {
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
            ..Default::default()
        };
        assert_eq!(cost(&usage, Some("some-future-model")), 0.0);
        assert_eq!(cost(&usage, None), 0.0);
    }

    #[test]
    fn known_model_computes_expected_cost() {
        let usage = Usage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
            cache_creation_input_tokens: 0,
            cache_read_input_tokens: 0,
            cache_creation: None,
        };
        let c = cost(&usage, Some("claude-3-5-sonnet-20241022"));
        assert!((c - 18.0).abs() < 1e-9);
    }

    #[test]
    fn prefix_matching_picks_the_longer_match() {
        let rate = rate_for("claude-3-5-haiku-20241022");
        assert_eq!(rate.input, 0.80);
    }
}
