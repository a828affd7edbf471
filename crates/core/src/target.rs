//! Per-turn supervision text: intent, requested slots, belief, actions, response.

use crate::tokens::{Section, SpecialToken, ITEM_SEPARATOR, NEW_LINES};
use crate::values::{Action, Belief, ItemCodec, RequestedSlot};

/// What the model should generate for one turn.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Target {
    pub beliefs: Vec<Belief>,
    pub actions: Vec<Action>,
    /// `None` when the dialogue ends on a user turn.
    pub response: Option<String>,
    pub active_intent: Option<String>,
    pub requested_slots: Option<Vec<RequestedSlot>>,
}

impl Target {
    pub fn new(beliefs: Vec<Belief>, actions: Vec<Action>, response: Option<String>) -> Self {
        Self {
            beliefs,
            actions,
            response,
            active_intent: None,
            requested_slots: None,
        }
    }

    /// Encode one section with its markers, without the trailing newlines.
    ///
    /// Intent and requested slots are optional and yield `None` when absent
    /// or empty. Belief, action and response sections are always present.
    pub fn encode_section(&self, section: Section) -> Option<String> {
        let body = match section {
            Section::Intent => self
                .active_intent
                .as_deref()
                .filter(|intent| !intent.is_empty())?
                .to_string(),
            Section::RequestedSlots => self
                .requested_slots
                .as_deref()
                .filter(|slots| !slots.is_empty())
                .map(join_items)?,
            Section::Belief => join_items(&self.beliefs),
            Section::Action => join_items(&self.actions),
            Section::Response => self.response.clone().unwrap_or_default(),
        };
        Some(format!("{}{}{}", section.begin(), body, section.end()))
    }

    /// Encode every present section in fixed order after `<|begintarget|>`.
    pub fn encode(&self) -> String {
        let mut out = String::from(SpecialToken::BeginTarget.as_str());
        for section in Section::ALL {
            if let Some(text) = self.encode_section(section) {
                out.push_str(&text);
                out.push_str(NEW_LINES);
            }
        }
        out
    }
}

fn join_items<T: ItemCodec>(items: &[T]) -> String {
    items
        .iter()
        .map(ItemCodec::encode)
        .collect::<Vec<_>>()
        .join(ITEM_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_minimal_target() {
        let target = Target::new(Vec::new(), Vec::new(), None);
        assert_eq!(
            target.encode(),
            "<|begintarget|><|beginbelief|><|endbelief|>\n\n\
             <|beginaction|><|endaction|>\n\n\
             <|beginresponse|><|endresponse|>\n\n"
        );
    }

    #[test]
    fn test_encode_full_target_section_order() {
        let target = Target {
            beliefs: vec![
                Belief::new("Hotels", "location", "Boston"),
                Belief::new("Hotels", "number_of_rooms", "1"),
            ],
            actions: vec![
                Action::with_values("Hotels", "INFORM", "Boston"),
                Action::with_slot("Hotels", "REQUEST", "check_in_date"),
            ],
            response: Some("When do you check in?".to_string()),
            active_intent: Some("ReserveHotel".to_string()),
            requested_slots: Some(vec![RequestedSlot::new("Hotels", "price")]),
        };

        assert_eq!(
            target.encode(),
            "<|begintarget|><|beginintent|>ReserveHotel<|endintent|>\n\n\
             <|beginrequestedslots|>Hotels_price<|endrequestedslots|>\n\n\
             <|beginbelief|>Hotels_location->Boston|Hotels_number_of_rooms->1<|endbelief|>\n\n\
             <|beginaction|>INFORM->Hotels_<-Boston|REQUEST->Hotels_check_in_date<-<|endaction|>\n\n\
             <|beginresponse|>When do you check in?<|endresponse|>\n\n"
        );
    }

    #[test]
    fn test_empty_optional_sections_are_skipped() {
        let target = Target {
            active_intent: Some(String::new()),
            requested_slots: Some(Vec::new()),
            ..Target::default()
        };
        assert_eq!(target.encode_section(Section::Intent), None);
        assert_eq!(target.encode_section(Section::RequestedSlots), None);
        assert_eq!(
            target.encode_section(Section::Belief).as_deref(),
            Some("<|beginbelief|><|endbelief|>")
        );
    }
}
