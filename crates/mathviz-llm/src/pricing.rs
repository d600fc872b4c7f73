//! Token prices per model, in USD per million tokens.

/// `(model prefix, input price, output price)`.
const PRICES: &[(&str, f64, f64)] = &[
    ("claude-opus-4-6", 5.0, 25.0),
    ("claude-opus-4-5", 15.0, 75.0),
    ("claude-sonnet-4-6", 3.0, 15.0),
    ("claude-sonnet-4-5", 3.0, 15.0),
    ("claude-haiku-4-5", 1.0, 5.0),
    ("gpt-4o-mini", 0.15, 0.6),
    ("gpt-4o", 2.5, 10.0),
    ("gpt-4-turbo", 10.0, 30.0),
    ("gpt-3.5-turbo", 0.5, 1.5),
];

/// Input/output price for a model. Longest matching prefix wins.
pub fn price_for(model: &str) -> Option<(f64, f64)> {
    PRICES
        .iter()
        .filter(|(prefix, _, _)| model.starts_with(prefix))
        .max_by_key(|(prefix, _, _)| prefix.len())
        .map(|&(_, input, output)| (input, output))
}

/// Estimated USD cost of one call; 0.0 for unknown models.
pub fn estimate_cost(model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
    price_for(model)
        .map(|(input, output)| {
            (input_tokens as f64 * input + output_tokens as f64 * output) / 1_000_000.0
        })
        .unwrap_or(0.0)
}
