//! Free-text caption to six-field description.
//!
//! Keyword rules over fixed vocabularies; the first rule whose keywords
//! appear in the lower-cased caption wins, otherwise the field default.

use super::ImageAnalysis;

/// Colour words recognised in captions (and in hint tags).
pub const CAPTION_COLOR_WORDS: &[&str] = &[
    "red", "blue", "green", "yellow", "orange", "purple", "pink", "brown", "black", "white",
    "gray", "grey", "silver", "gold", "golden", "dark", "light", "bright",
];

const MAX_COLORS: usize = 3;

type Rule = (&'static [&'static str], &'static str);

const BACKGROUND_RULES: &[Rule] = &[
    (
        &["outdoor", "outside", "street", "road", "park", "garden"],
        "outdoor environment",
    ),
    (
        &["room", "kitchen", "bedroom", "office"],
        "indoor room setting",
    ),
    (
        &["studio", "plain", "background"],
        "studio or neutral background",
    ),
];
const DEFAULT_BACKGROUND: &str = "indoor setting";

const ATMOSPHERE_RULES: &[Rule] = &[
    (&["bright", "sunny", "cheerful"], "bright and cheerful"),
    (&["dark", "moody", "dramatic"], "dramatic and moody"),
    (&["calm", "peaceful", "serene"], "calm and peaceful"),
    (&["busy", "crowded", "active"], "busy and dynamic"),
];
const DEFAULT_ATMOSPHERE: &str = "neutral mood";

const IMPRESSION_RULES: &[Rule] = &[
    (
        &["beautiful", "stunning", "gorgeous"],
        "aesthetically pleasing and beautiful",
    ),
    (&["cute", "adorable", "sweet"], "charming and endearing"),
    (
        &["professional", "formal", "business"],
        "professional and polished",
    ),
    (
        &["artistic", "creative", "unique"],
        "artistic and creative expression",
    ),
];
const DEFAULT_IMPRESSION: &str = "interesting visual composition";

const STYLE_RULES: &[Rule] = &[
    (&["portrait", "person", "face"], "portrait photography"),
    (&["landscape", "scenery", "nature"], "landscape photography"),
    (&["close", "macro", "detail"], "close-up or macro photography"),
    (&["street", "urban", "city"], "street or urban photography"),
    (&["food", "meal", "dish"], "food photography"),
];
const DEFAULT_STYLE: &str = "photography";

const DEFAULT_COLORS: &str = "natural tones";

fn first_match(lower: &str, rules: &[Rule], default: &str) -> String {
    rules
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, label)| *label)
        .unwrap_or(default)
        .to_string()
}

/// Subject phrase: whatever follows the first "a " in the caption.
fn subject_of(description: &str) -> String {
    let trimmed = description.trim();
    // ASCII lowercasing keeps byte offsets aligned with the original text.
    let subject = match trimmed.to_ascii_lowercase().find("a ") {
        Some(idx) => trimmed[idx + 2..].trim(),
        None => trimmed,
    };

    if subject.is_empty() {
        trimmed.to_string()
    } else {
        subject.to_string()
    }
}

fn colors_of(lower: &str, hint_tags: &[String]) -> String {
    let mut colors: Vec<String> = CAPTION_COLOR_WORDS
        .iter()
        .filter(|c| lower.contains(*c))
        .map(|c| c.to_string())
        .collect();

    for tag in hint_tags {
        let tag = tag.trim().to_lowercase();
        if CAPTION_COLOR_WORDS.contains(&tag.as_str()) && !colors.contains(&tag) {
            colors.push(tag);
        }
    }

    if colors.is_empty() {
        DEFAULT_COLORS.to_string()
    } else {
        colors.truncate(MAX_COLORS);
        colors.join(", ")
    }
}

/// Map a provider caption and optional hint tags to the six fields.
pub fn parse_description(description: &str, hint_tags: &[String]) -> ImageAnalysis {
    let lower = description.to_lowercase();

    ImageAnalysis {
        what_it_is: subject_of(description),
        main_colors: colors_of(&lower, hint_tags),
        background: first_match(&lower, BACKGROUND_RULES, DEFAULT_BACKGROUND),
        atmosphere: first_match(&lower, ATMOSPHERE_RULES, DEFAULT_ATMOSPHERE),
        impression: first_match(&lower, IMPRESSION_RULES, DEFAULT_IMPRESSION),
        style: first_match(&lower, STYLE_RULES, DEFAULT_STYLE),
    }
}
