//! Structural tokens and separators of the linearized text format.

use std::fmt;

/// Separates a domain from a slot name: `Hotels_city`.
pub const DOMAIN_SLOT_SEPARATOR: &str = "_";
/// Separates a slot from its value, or an act type from its domain.
pub const SLOT_VALUE_SEPARATOR: &str = "->";
/// Separates an action's slot from its values.
pub const ACTION_VALUE_SEPARATOR: &str = "<-";
/// Separates items inside a list section.
pub const ITEM_SEPARATOR: &str = "|";
/// Appended after every target section.
pub const NEW_LINES: &str = "\n\n";
/// File-name suffix for delexicalized corpora.
pub const DELEXICALIZED: &str = "_delexicalized";

pub const ACTION_TYPE_INFORM: &str = "INFORM";
pub const ACTION_TYPE_INFORM_COUNT: &str = "INFORM_COUNT";

/// Marker tokens that delimit the context and target sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecialToken {
    BeginTarget,
    EndTarget,
    BeginContext,
    EndContext,
    System,
    User,
    BeginLastUserUtterance,
    EndLastUserUtterance,
    BeginBelief,
    EndBelief,
    BeginResponse,
    EndResponse,
    BeginAction,
    EndAction,
    BeginIntent,
    EndIntent,
    BeginRequestedSlots,
    EndRequestedSlots,
    PromptIntent,
    PromptRequestedSlots,
    PromptBelief,
    PromptAction,
    PromptResponse,
}

impl SpecialToken {
    pub const ALL: [SpecialToken; 23] = [
        SpecialToken::BeginTarget,
        SpecialToken::EndTarget,
        SpecialToken::BeginContext,
        SpecialToken::EndContext,
        SpecialToken::System,
        SpecialToken::User,
        SpecialToken::BeginLastUserUtterance,
        SpecialToken::EndLastUserUtterance,
        SpecialToken::BeginBelief,
        SpecialToken::EndBelief,
        SpecialToken::BeginResponse,
        SpecialToken::EndResponse,
        SpecialToken::BeginAction,
        SpecialToken::EndAction,
        SpecialToken::BeginIntent,
        SpecialToken::EndIntent,
        SpecialToken::BeginRequestedSlots,
        SpecialToken::EndRequestedSlots,
        SpecialToken::PromptIntent,
        SpecialToken::PromptRequestedSlots,
        SpecialToken::PromptBelief,
        SpecialToken::PromptAction,
        SpecialToken::PromptResponse,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SpecialToken::BeginTarget => "<|begintarget|>",
            SpecialToken::EndTarget => "<|endtarget|>",
            SpecialToken::BeginContext => "<|begincontext|>",
            SpecialToken::EndContext => "<|endcontext|>",
            SpecialToken::System => "<|system|>",
            SpecialToken::User => "<|user|>",
            SpecialToken::BeginLastUserUtterance => "<|beginlastuserutterance|>",
            SpecialToken::EndLastUserUtterance => "<|endlastuserutterance|>",
            SpecialToken::BeginBelief => "<|beginbelief|>",
            SpecialToken::EndBelief => "<|endbelief|>",
            SpecialToken::BeginResponse => "<|beginresponse|>",
            SpecialToken::EndResponse => "<|endresponse|>",
            SpecialToken::BeginAction => "<|beginaction|>",
            SpecialToken::EndAction => "<|endaction|>",
            SpecialToken::BeginIntent => "<|beginintent|>",
            SpecialToken::EndIntent => "<|endintent|>",
            SpecialToken::BeginRequestedSlots => "<|beginrequestedslots|>",
            SpecialToken::EndRequestedSlots => "<|endrequestedslots|>",
            SpecialToken::PromptIntent => "<|promptintent|>",
            SpecialToken::PromptRequestedSlots => "<|promptrequestedslots|>",
            SpecialToken::PromptBelief => "<|promptbelief|>",
            SpecialToken::PromptAction => "<|promptaction|>",
            SpecialToken::PromptResponse => "<|promptresponse|>",
        }
    }

    /// Every marker literal, in declaration order.
    ///
    /// This is the list a tokenizer registers as additional special tokens.
    pub fn list_all() -> Vec<&'static str> {
        Self::ALL.iter().map(|t| t.as_str()).collect()
    }
}

impl fmt::Display for SpecialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tokens owned by the tokenizer rather than the text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizerToken {
    Pad,
    Eos,
    Bos,
}

impl TokenizerToken {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenizerToken::Pad => "<|pad|>",
            TokenizerToken::Eos => "<|endoftext|>",
            TokenizerToken::Bos => "<|startoftext|>",
        }
    }
}

impl fmt::Display for TokenizerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bracketed section of the target text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Intent,
    RequestedSlots,
    Belief,
    Action,
    Response,
}

impl Section {
    /// Sections in the order they are written into a target.
    pub const ALL: [Section; 5] = [
        Section::Intent,
        Section::RequestedSlots,
        Section::Belief,
        Section::Action,
        Section::Response,
    ];

    pub fn begin(self) -> SpecialToken {
        match self {
            Section::Intent => SpecialToken::BeginIntent,
            Section::RequestedSlots => SpecialToken::BeginRequestedSlots,
            Section::Belief => SpecialToken::BeginBelief,
            Section::Action => SpecialToken::BeginAction,
            Section::Response => SpecialToken::BeginResponse,
        }
    }

    pub fn end(self) -> SpecialToken {
        match self {
            Section::Intent => SpecialToken::EndIntent,
            Section::RequestedSlots => SpecialToken::EndRequestedSlots,
            Section::Belief => SpecialToken::EndBelief,
            Section::Action => SpecialToken::EndAction,
            Section::Response => SpecialToken::EndResponse,
        }
    }

    /// Prompt token that asks for this section alone in multi-task rows.
    pub fn prompt(self) -> SpecialToken {
        match self {
            Section::Intent => SpecialToken::PromptIntent,
            Section::RequestedSlots => SpecialToken::PromptRequestedSlots,
            Section::Belief => SpecialToken::PromptBelief,
            Section::Action => SpecialToken::PromptAction,
            Section::Response => SpecialToken::PromptResponse,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Section::Intent => "intent",
            Section::RequestedSlots => "requested_slots",
            Section::Belief => "belief",
            Section::Action => "action",
            Section::Response => "response",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_all_is_complete_and_unique() {
        let all = SpecialToken::list_all();
        assert_eq!(all.len(), 23);
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
        assert_eq!(all[0], "<|begintarget|>");
        assert!(all.contains(&"<|beginlastuserutterance|>"));
    }

    #[test]
    fn test_section_markers_pair_up() {
        for section in Section::ALL {
            let begin = section.begin().as_str();
            let end = section.end().as_str();
            assert_eq!(begin.replace("begin", "end"), end);
            assert!(section.prompt().as_str().starts_with("<|prompt"));
            assert_eq!(
                section.prompt().as_str(),
                format!("<|prompt{}|>", section.name().replace('_', ""))
            );
        }
    }

    #[test]
    fn test_separators() {
        assert_eq!(DOMAIN_SLOT_SEPARATOR, "_");
        assert_eq!(SLOT_VALUE_SEPARATOR, "->");
        assert_eq!(ACTION_VALUE_SEPARATOR, "<-");
        assert_eq!(ITEM_SEPARATOR, "|");
        assert_eq!(TokenizerToken::Pad.to_string(), "<|pad|>");
    }
}
