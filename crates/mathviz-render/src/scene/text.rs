//! Display text, color and axis-range cleanup applied before a scene is written.

/// ASCII approximations replaced in display text, applied in this order.
const TEXT_REPLACEMENTS: &[(&str, &str)] = &[
    ("=/", "≠"),
    ("!=", "≠"),
    ("/=", "≠"),
    ("~=", "≈"),
    (">=", "≥"),
    ("<=", "≤"),
    ("->", "→"),
    ("<-", "←"),
    ("=>", "⇒"),
    ("<=>", "⟺"),
    ("...", "…"),
];

/// Replaces ASCII operator approximations with their Unicode symbols.
///
/// Only for `Text` content; LaTeX must never pass through here.
pub fn normalize_text(text: &str) -> String {
    TEXT_REPLACEMENTS
        .iter()
        .fold(text.to_string(), |acc, (from, to)| acc.replace(from, to))
}

/// Manim color constants accepted as-is.
const PALETTE: &[&str] = &[
    "BLUE", "BLUE_B", "BLUE_C", "BLUE_D", "BLUE_E", "GREEN", "GREEN_B", "GREEN_C", "RED",
    "RED_B", "RED_C", "YELLOW", "YELLOW_C", "WHITE", "BLACK", "ORANGE", "TEAL", "TEAL_B",
    "TEAL_C", "PURPLE", "PURPLE_B", "PURPLE_C", "GOLD", "GOLD_C", "PINK", "MAROON", "GREY",
    "LIGHT_BROWN",
];

/// Names Manim lacks, mapped to the closest constant.
const ALIASES: &[(&str, &str)] = &[
    ("GRAY", "GREY"),
    ("CYAN", "TEAL_C"),
    ("AQUA", "TEAL_B"),
    ("MAGENTA", "PINK"),
    ("VIOLET", "PURPLE_C"),
    ("INDIGO", "PURPLE"),
    ("LIME", "GREEN_B"),
    ("NAVY", "BLUE_E"),
    ("CORAL", "RED_B"),
    ("BROWN", "LIGHT_BROWN"),
    ("SILVER", "GREY"),
    ("GOLD_YELLOW", "GOLD_C"),
];

/// Resolves a color name to a Manim constant name or a `#RRGGBB[AA]` hex string.
///
/// Names are case-insensitive. Unknown values resolve to `fallback`.
pub fn resolve_color(name: &str, fallback: &str) -> String {
    let trimmed = name.trim();
    let upper = trimmed.to_uppercase();

    if let Some(known) = PALETTE.iter().find(|c| **c == upper) {
        return known.to_string();
    }
    if let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == upper) {
        return target.to_string();
    }
    if upper.starts_with('#') && matches!(upper.len(), 7 | 9) {
        return trimmed.to_string();
    }
    fallback.to_string()
}

/// Normalizes an axis range to `[min, max, step]`.
pub fn safe_range(values: &[f64]) -> [f64; 3] {
    match values {
        [a, b, c, ..] => [*a, *b, *c],
        [a, b] => {
            let step = ((b - a) / 5.0).round().max(1.0);
            [*a, *b, step]
        }
        _ => [-5.0, 5.0, 1.0],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_become_symbols() {
        assert_eq!(normalize_text("a != b"), "a ≠ b");
        assert_eq!(normalize_text("x >= 0 and y <= 1"), "x ≥ 0 and y ≤ 1");
        assert_eq!(normalize_text("f: A -> B"), "f: A → B");
        assert_eq!(normalize_text("p => q"), "p ⇒ q");
        assert_eq!(normalize_text("wait..."), "wait…");
        assert_eq!(normalize_text("x ~= 3.14"), "x ≈ 3.14");
        assert_eq!(normalize_text("plain"), "plain");
    }

    #[test]
    fn colors_resolve_case_insensitively() {
        assert_eq!(resolve_color("yellow", "BLUE"), "YELLOW");
        assert_eq!(resolve_color(" blue_c ", "YELLOW"), "BLUE_C");
        assert_eq!(resolve_color("cyan", "YELLOW"), "TEAL_C");
        assert_eq!(resolve_color("Gray", "YELLOW"), "GREY");
        assert_eq!(resolve_color("navy", "YELLOW"), "BLUE_E");
    }

    #[test]
    fn hex_passes_and_junk_falls_back() {
        assert_eq!(resolve_color("#FFD700", "YELLOW"), "#FFD700");
        assert_eq!(resolve_color("#ffd700aa", "YELLOW"), "#ffd700aa");
        assert_eq!(resolve_color("#FFF", "YELLOW"), "YELLOW");
        assert_eq!(resolve_color("chartreuse", "BLUE_C"), "BLUE_C");
        assert_eq!(resolve_color("", "BLUE"), "BLUE");
    }

    #[test]
    fn ranges_are_padded_to_three() {
        assert_eq!(safe_range(&[-2.0, 2.0, 0.5, 9.0]), [-2.0, 2.0, 0.5]);
        assert_eq!(safe_range(&[0.0, 20.0]), [0.0, 20.0, 4.0]);
        assert_eq!(safe_range(&[0.0, 2.0]), [0.0, 2.0, 1.0]);
        assert_eq!(safe_range(&[1.0]), [-5.0, 5.0, 1.0]);
        assert_eq!(safe_range(&[]), [-5.0, 5.0, 1.0]);
    }
}
