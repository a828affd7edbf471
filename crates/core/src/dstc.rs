//! Raw schema-guided (DSTC8 / SGD) dialogue records as they appear on disk.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Speaker {
    User,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstcDialogue {
    pub dialogue_id: String,
    #[serde(default)]
    pub services: Vec<String>,
    pub turns: Vec<DstcTurn>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstcTurn {
    pub speaker: Speaker,
    pub utterance: String,
    #[serde(default)]
    pub frames: Vec<DstcFrame>,
}

/// Annotations of one service (domain) within a turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstcFrame {
    pub service: String,
    #[serde(default)]
    pub slots: Vec<DstcSlotSpan>,
    #[serde(default)]
    pub actions: Vec<DstcAction>,
    /// Only user turns carry a dialogue state.
    #[serde(default)]
    pub state: Option<DstcState>,
}

/// Character span of a slot value inside the turn's utterance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstcSlotSpan {
    pub slot: String,
    pub start: usize,
    pub exclusive_end: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DstcAction {
    pub act: String,
    #[serde(default)]
    pub slot: String,
    #[serde(default)]
    pub values: Vec<String>,
    #[serde(default)]
    pub canonical_values: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DstcState {
    #[serde(default)]
    pub active_intent: String,
    #[serde(default)]
    pub requested_slots: Vec<String>,
    #[serde(default)]
    pub slot_values: BTreeMap<String, Vec<String>>,
}

/// Domain of a service: `Hotels_1` -> `Hotels`.
pub fn dstc_service_name(service: &str) -> &str {
    match service.find('_') {
        Some(idx) => &service[..idx],
        None => service,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name() {
        assert_eq!(dstc_service_name("Hotels_1"), "Hotels");
        assert_eq!(dstc_service_name("RentalCars_3"), "RentalCars");
        assert_eq!(dstc_service_name("Alarm"), "Alarm");
    }

    #[test]
    fn test_deserialize_turn() {
        let json = r#"{
            "dialogue_id": "1_00000",
            "services": ["Restaurants_1"],
            "turns": [
                {
                    "speaker": "USER",
                    "utterance": "Find me a table in San Jose.",
                    "frames": [{
                        "service": "Restaurants_1",
                        "slots": [{"slot": "city", "start": 19, "exclusive_end": 27}],
                        "actions": [{"act": "INFORM", "slot": "city", "values": ["San Jose"], "canonical_values": ["San Jose"]}],
                        "state": {
                            "active_intent": "FindRestaurants",
                            "requested_slots": [],
                            "slot_values": {"city": ["San Jose"]}
                        }
                    }]
                },
                {
                    "speaker": "SYSTEM",
                    "utterance": "What cuisine?",
                    "frames": [{
                        "service": "Restaurants_1",
                        "actions": [{"act": "REQUEST", "slot": "cuisine", "values": []}]
                    }]
                }
            ]
        }"#;
        let dialogue: DstcDialogue = serde_json::from_str(json).unwrap();
        assert_eq!(dialogue.turns.len(), 2);
        assert_eq!(dialogue.turns[0].speaker, Speaker::User);
        let state = dialogue.turns[0].frames[0].state.as_ref().unwrap();
        assert_eq!(state.slot_values["city"], vec!["San Jose"]);
        assert!(dialogue.turns[1].frames[0].state.is_none());
        assert!(dialogue.turns[1].frames[0].slots.is_empty());
    }
}
