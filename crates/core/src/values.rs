//! Belief, action and requested-slot items with their text codecs.
//!
//! Encoding is total. Decoding is total as well: text that does not follow the
//! grammar (as generated text often does not) decodes into a partially empty
//! item that keeps the raw text in `prediction`.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::tokens::{
    ACTION_TYPE_INFORM, ACTION_TYPE_INFORM_COUNT, ACTION_VALUE_SEPARATOR, DOMAIN_SLOT_SEPARATOR,
    SLOT_VALUE_SEPARATOR,
};

/// An item that can be written into, and recovered from, a list section.
pub trait ItemCodec: Sized {
    fn encode(&self) -> String;

    /// Best-effort decode. Never fails.
    fn decode(text: &str) -> Self;
}

/// One stage of a staged decode: split at the first separator.
fn split_stage<'a>(text: &'a str, separator: &str) -> Option<(&'a str, &'a str)> {
    text.split_once(separator)
}

/// A belief-state entry: `domain_slot->value`.
#[derive(Debug, Clone, Default)]
pub struct Belief {
    pub domain: String,
    pub slot_name: String,
    pub value: String,
    /// Raw text kept when decoding could not fully parse it.
    pub prediction: Option<String>,
}

impl Belief {
    pub fn new(
        domain: impl Into<String>,
        slot_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            slot_name: slot_name.into(),
            value: value.into(),
            prediction: None,
        }
    }
}

impl ItemCodec for Belief {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(text: &str) -> Self {
        let Some((dom_slot, value)) = split_stage(text, SLOT_VALUE_SEPARATOR) else {
            return Self {
                prediction: Some(text.to_string()),
                ..Self::default()
            };
        };
        match split_stage(dom_slot, DOMAIN_SLOT_SEPARATOR) {
            Some((domain, slot_name)) => Self::new(domain, slot_name, value),
            None => Self {
                value: value.to_string(),
                prediction: Some(text.to_string()),
                ..Self::default()
            },
        }
    }
}

impl fmt::Display for Belief {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.domain, DOMAIN_SLOT_SEPARATOR, self.slot_name, SLOT_VALUE_SEPARATOR, self.value
        )
    }
}

impl PartialEq for Belief {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.slot_name == other.slot_name
            && self.value == other.value
    }
}

impl Eq for Belief {}

impl Hash for Belief {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.slot_name.hash(state);
        self.value.hash(state);
    }
}

/// A dialogue act: `ACT->domain_slot<-values`.
///
/// User acts carry their payload in `values`; system acts carry it in
/// `slot_name`. Scoring reads the field the linearizer filled, so the two
/// must not be merged.
#[derive(Debug, Clone, Default)]
pub struct Action {
    pub domain: String,
    pub action_type: String,
    pub slot_name: String,
    pub values: String,
    pub prediction: Option<String>,
}

impl Action {
    /// A user act: payload goes into `values`.
    pub fn with_values(
        domain: impl Into<String>,
        action_type: impl Into<String>,
        values: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            action_type: action_type.into(),
            values: values.into(),
            ..Self::default()
        }
    }

    /// A system act: payload goes into `slot_name`.
    pub fn with_slot(
        domain: impl Into<String>,
        action_type: impl Into<String>,
        slot_name: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            action_type: action_type.into(),
            slot_name: slot_name.into(),
            ..Self::default()
        }
    }

    pub fn is_inform(&self) -> bool {
        self.action_type == ACTION_TYPE_INFORM || self.action_type == ACTION_TYPE_INFORM_COUNT
    }
}

impl ItemCodec for Action {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(text: &str) -> Self {
        let Some((action_type, rest)) = split_stage(text, SLOT_VALUE_SEPARATOR) else {
            return Self {
                prediction: Some(text.to_string()),
                ..Self::default()
            };
        };
        let Some((dom_slot, values)) = split_stage(rest, ACTION_VALUE_SEPARATOR) else {
            return Self {
                action_type: action_type.to_string(),
                prediction: Some(text.to_string()),
                ..Self::default()
            };
        };
        match split_stage(dom_slot, DOMAIN_SLOT_SEPARATOR) {
            Some((domain, slot_name)) => Self {
                domain: domain.to_string(),
                action_type: action_type.to_string(),
                slot_name: slot_name.to_string(),
                values: values.to_string(),
                prediction: None,
            },
            None => Self {
                action_type: action_type.to_string(),
                values: values.to_string(),
                prediction: Some(text.to_string()),
                ..Self::default()
            },
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}{}{}",
            self.action_type,
            SLOT_VALUE_SEPARATOR,
            self.domain,
            DOMAIN_SLOT_SEPARATOR,
            self.slot_name,
            ACTION_VALUE_SEPARATOR,
            self.values
        )
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.domain == other.domain
            && self.action_type == other.action_type
            && self.slot_name == other.slot_name
            && self.values == other.values
    }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.domain.hash(state);
        self.action_type.hash(state);
        self.slot_name.hash(state);
        self.values.hash(state);
    }
}

/// A slot the user asked the system about: `domain_slot`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestedSlot {
    pub domain: String,
    pub slot_name: String,
}

impl RequestedSlot {
    pub fn new(domain: impl Into<String>, slot_name: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            slot_name: slot_name.into(),
        }
    }
}

impl ItemCodec for RequestedSlot {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(text: &str) -> Self {
        match split_stage(text, DOMAIN_SLOT_SEPARATOR) {
            Some((domain, slot_name)) => Self::new(domain, slot_name),
            None => Self::new("", text),
        }
    }
}

impl fmt::Display for RequestedSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.domain, DOMAIN_SLOT_SEPARATOR, self.slot_name)
    }
}
