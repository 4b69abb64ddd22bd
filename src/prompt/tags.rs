//! Tag-delimited sections in model replies
//!
//! Models are asked to wrap the user-facing answer in `<response>` and any
//! follow-ups in `<actionitems>`. They do not always comply, so both
//! extractors have a defined fallback instead of an error.

use regex::Regex;
use std::sync::OnceLock;

fn response_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<response>(.*?)</response>").expect("valid regex"))
}

fn action_items_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)<actionitems>(.*?)</actionitems>").expect("valid regex")
    })
}

/// Extract content from the first `<response>...</response>` block.
///
/// Returns the original text unchanged when no block is present.
pub fn extract_response_content(text: &str) -> String {
    match response_re().captures(text).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => text.to_string(),
    }
}

/// Extract content from every `<actionitems>...</actionitems>` block,
/// newline-joined in source order. Empty when there are none.
pub fn extract_action_items(text: &str) -> String {
    action_items_re()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .collect::<Vec<_>>()
        .join("\n")
}
