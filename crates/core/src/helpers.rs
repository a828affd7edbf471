//! Helper functions for pulling sections back out of linearized text.

use regex::Regex;
use std::sync::LazyLock;

use crate::tokens::{TokenizerToken, ITEM_SEPARATOR, NEW_LINES};

static PADDING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&regex::escape(TokenizerToken::Pad.as_str())).unwrap());

/// Return the text between the first `start_token` and the next `end_token`.
///
/// Returns `None` when either marker is missing, so callers pick their own
/// default with `unwrap_or`.
pub fn text_between<'a>(text: &'a str, start_token: &str, end_token: &str) -> Option<&'a str> {
    let begin = text.find(start_token)? + start_token.len();
    let len = text[begin..].find(end_token)?;
    Some(&text[begin..begin + len])
}

/// Return every non-empty, non-overlapping section between the two markers,
/// left to right.
///
/// Section separators (`\n\n`) are dropped before matching. Returns `None`
/// when nothing matches.
pub fn all_text_between(text: &str, start_token: &str, end_token: &str) -> Option<Vec<String>> {
    let flattened = text.replace(NEW_LINES, "");
    let pattern = format!(
        "{}(.+?){}",
        regex::escape(start_token),
        regex::escape(end_token)
    );
    let re = Regex::new(&pattern).ok()?;
    let items: Vec<String> = re
        .captures_iter(&flattened)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

/// Remove every occurrence of each token from `text`.
pub fn remove_tokens_from_text(text: &str, tokens: &[&str]) -> String {
    tokens
        .iter()
        .fold(text.to_string(), |acc, token| acc.replace(token, ""))
}

/// Strip tokenizer padding from generated text.
pub fn remove_padding(text: &str) -> String {
    PADDING_RE.replace_all(text, "").to_string()
}

/// Split a list section into its items. An empty section has no items.
pub fn split_items(section: &str) -> Vec<&str> {
    if section.is_empty() {
        return Vec::new();
    }
    section.split(ITEM_SEPARATOR).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const BEGIN: &str = "<|beginbelief|>";
    const END: &str = "<|endbelief|>";

    #[test]
    fn test_text_between_single() {
        let text = "<|begintarget|><|beginbelief|>Hotels_city->Boston<|endbelief|>\n\n";
        assert_eq!(text_between(text, BEGIN, END), Some("Hotels_city->Boston"));
    }

    #[test]
    fn test_text_between_missing_returns_default() {
        let text = "<|beginaction|>REQUEST->Hotels_city<-<|endaction|>";
        assert_eq!(text_between(text, BEGIN, END).unwrap_or("DEFAULT"), "DEFAULT");
        // Unterminated section
        let text = "<|beginbelief|>Hotels_city->Bos";
        assert_eq!(text_between(text, BEGIN, END), None);
    }

    #[test]
    fn test_text_between_end_before_start() {
        let text = "<|endbelief|>junk<|beginbelief|>a->b<|endbelief|>";
        assert_eq!(text_between(text, BEGIN, END), Some("a->b"));
    }

    #[test]
    fn test_all_text_between_in_order() {
        let text = "<|beginbelief|>first<|endbelief|>\n\nnoise<|beginbelief|>second<|endbelief|>\n\n<|beginbelief|>third<|endbelief|>";
        assert_eq!(
            all_text_between(text, BEGIN, END),
            Some(vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string()
            ])
        );
    }

    #[test]
    fn test_all_text_between_none() {
        assert_eq!(all_text_between("plain text", BEGIN, END), None);
        // Empty sections do not match
        assert_eq!(all_text_between("<|beginbelief|><|endbelief|>", BEGIN, END), None);
    }

    #[test]
    fn test_remove_tokens() {
        assert_eq!(
            remove_tokens_from_text("<|pad|>a<|user|>b<|pad|>", &["<|pad|>", "<|user|>"]),
            "ab"
        );
        assert_eq!(remove_padding("x<|pad|><|pad|>"), "x");
    }

    #[test]
    fn test_split_items() {
        assert!(split_items("").is_empty());
        assert_eq!(split_items("a|b|c"), vec!["a", "b", "c"]);
        assert_eq!(split_items("a"), vec!["a"]);
    }

    proptest! {
        #[test]
        fn text_between_recovers_body(prefix in "\\PC{0,12}", body in "\\PC{0,24}") {
            prop_assume!(!prefix.contains(BEGIN) && !body.contains(END));
            let text = format!("{}{}{}{}\n\n", prefix, BEGIN, body, END);
            prop_assert_eq!(text_between(&text, BEGIN, END), Some(body.as_str()));
        }

        #[test]
        fn text_between_is_total(text in "\\PC{0,40}") {
            let _ = text_between(&text, BEGIN, END);
            let _ = all_text_between(&text, BEGIN, END);
        }

        #[test]
        fn split_items_inverts_join(items in proptest::collection::vec("[^|]{0,8}", 1..6)) {
            let section = items.join(ITEM_SEPARATOR);
            let split = split_items(&section);
            if section.is_empty() {
                prop_assert!(split.is_empty());
            } else {
                prop_assert_eq!(split, items.iter().map(String::as_str).collect::<Vec<_>>());
            }
        }
    }
}
