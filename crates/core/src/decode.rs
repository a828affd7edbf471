//! Section-by-section decoding of (possibly malformed) target text.

use crate::helpers::{remove_padding, split_items, text_between};
use crate::tokens::Section;
use crate::values::{Action, Belief, ItemCodec, RequestedSlot};

/// Decode every item of a list section. An empty section has no items.
pub fn decode_items<T: ItemCodec>(section: &str) -> Vec<T> {
    split_items(section).into_iter().map(T::decode).collect()
}

/// Extract the raw body of one section, if both markers are present.
pub fn section_text(text: &str, section: Section) -> Option<&str> {
    text_between(text, section.begin().as_str(), section.end().as_str())
}

/// Structured view of a target string, reference or generated.
///
/// Missing sections decode as absent or empty; nothing here fails.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTarget {
    pub active_intent: Option<String>,
    pub requested_slots: Vec<RequestedSlot>,
    pub beliefs: Vec<Belief>,
    pub actions: Vec<Action>,
    pub response: Option<String>,
}

impl DecodedTarget {
    pub fn parse(text: &str) -> Self {
        let text = remove_padding(text);
        Self {
            active_intent: section_text(&text, Section::Intent).map(str::to_string),
            requested_slots: decode_items(
                section_text(&text, Section::RequestedSlots).unwrap_or(""),
            ),
            beliefs: decode_items(section_text(&text, Section::Belief).unwrap_or("")),
            actions: decode_items(section_text(&text, Section::Action).unwrap_or("")),
            response: section_text(&text, Section::Response).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use crate::target::Target;

    #[test]
    fn test_parse_encoded_target() {
        let target = Target {
            beliefs: vec![Belief::new("Hotels", "location", "Boston")],
            actions: vec![
                Action::with_values("Hotels", "INFORM", "Boston"),
                Action::with_slot("Hotels", "REQUEST", "check_in_date"),
            ],
            response: Some("When?".to_string()),
            active_intent: Some("ReserveHotel".to_string()),
            requested_slots: Some(vec![RequestedSlot::new("Hotels", "phone_number")]),
        };
        let decoded = DecodedTarget::parse(&target.encode());
        assert_eq!(decoded.beliefs, target.beliefs);
        assert_eq!(decoded.actions, target.actions);
        assert_eq!(decoded.response.as_deref(), Some("When?"));
        assert_eq!(decoded.active_intent.as_deref(), Some("ReserveHotel"));
        assert_eq!(decoded.requested_slots, vec![RequestedSlot::new("Hotels", "phone_number")]);
    }

    #[test]
    fn test_parse_generated_garbage() {
        let decoded = DecodedTarget::parse("<|pad|><|beginbelief|>Hotels city Boston|<|endbelief|>");
        assert_eq!(decoded.beliefs.len(), 2);
        assert_eq!(
            decoded.beliefs[0].prediction.as_deref(),
            Some("Hotels city Boston")
        );
        assert!(decoded.actions.is_empty());
        assert_eq!(decoded.response, None);

        let decoded = DecodedTarget::parse("");
        assert_eq!(decoded, DecodedTarget::default());
    }

    #[test]
    fn test_padding_is_ignored() {
        let decoded =
            DecodedTarget::parse("<|beginresponse|>ok<|endresponse|><|pad|><|pad|>");
        assert_eq!(decoded.response.as_deref(), Some("ok"));
        let decoded = DecodedTarget::parse("<|beginresponse|>o<|pad|>k<|endresponse|>");
        assert_eq!(decoded.response.as_deref(), Some("ok"));
    }

    fn separator_soup() -> impl Strategy<Value = String> {
        proptest::collection::vec(
            prop_oneof![
                "\\PC{0,6}",
                Just("->".to_string()),
                Just("<-".to_string()),
                Just("_".to_string()),
                Just("|".to_string()),
            ],
            0..12,
        )
        .prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn parse_is_total(text in separator_soup()) {
            let _ = DecodedTarget::parse(&text);
        }

        #[test]
        fn parse_decodes_every_item(belief in separator_soup(), action in separator_soup()) {
            prop_assume!(!belief.contains("<|") && !action.contains("<|"));
            let text = format!(
                "<|begintarget|><|beginbelief|>{}<|endbelief|>\n\n<|beginaction|>{}<|endaction|>\n\n",
                belief, action
            );
            let decoded = DecodedTarget::parse(&text);
            prop_assert_eq!(decoded.beliefs.len(), split_items(&belief).len());
            prop_assert_eq!(decoded.actions.len(), split_items(&action).len());
            for (item, raw) in decoded.beliefs.iter().zip(split_items(&belief)) {
                if !raw.contains("->") {
                    prop_assert_eq!(item.prediction.as_deref(), Some(raw));
                }
            }
        }
    }
}
