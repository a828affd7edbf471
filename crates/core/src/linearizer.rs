//! Turn-by-turn linearization of annotated dialogues into (context, target) pairs.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::Context;
use crate::dstc::{dstc_service_name, DstcDialogue, DstcFrame, DstcTurn, Speaker};
use crate::error::Result;
use crate::target::Target;
use crate::tokens::Section;
use crate::values::{Action, Belief, RequestedSlot};
use crate::DEFAULT_CONTEXT_MAX_LENGTH;

/// Intent value SGD uses for "no active intent".
const NO_INTENT: &str = "NONE";

/// Configuration for the DialogueLinearizer.
#[derive(Debug, Clone)]
pub struct LinearizerConfig {
    /// Number of past user (and system) utterances kept in each context.
    pub context_max_length: usize,
    /// Replace annotated slot values in system responses with placeholders.
    pub delexicalize: bool,
    pub with_active_intent: bool,
    pub with_requested_slots: bool,
}

impl Default for LinearizerConfig {
    fn default() -> Self {
        Self {
            context_max_length: DEFAULT_CONTEXT_MAX_LENGTH,
            delexicalize: false,
            with_active_intent: false,
            with_requested_slots: false,
        }
    }
}

/// One flattened row of the prepared corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnCsvRow {
    pub dialog_id: String,
    pub turn_id: usize,
    pub context: String,
    pub target: String,
}

/// A linearized (user, system) turn pair.
///
/// Owns its context snapshot; later turns never alias it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub context: Context,
    pub target: Target,
    pub dialog_id: String,
    pub turn_id: usize,
}

impl Turn {
    pub fn to_csv_row(&self) -> Result<TurnCsvRow> {
        Ok(TurnCsvRow {
            dialog_id: self.dialog_id.clone(),
            turn_id: self.turn_id,
            context: self.context.encode()?,
            target: self.target.encode(),
        })
    }

    /// One row per present target section, each prompted for that section only.
    pub fn to_multi_task_rows(&self) -> Result<Vec<TurnCsvRow>> {
        let context = self.context.encode()?;
        Ok(Section::ALL
            .into_iter()
            .filter_map(|section| {
                let Some(target) = self.target.encode_section(section) else {
                    debug!(
                        "Dialogue {} turn {}: no {} section",
                        self.dialog_id,
                        self.turn_id,
                        section.name()
                    );
                    return None;
                };
                Some(TurnCsvRow {
                    dialog_id: self.dialog_id.clone(),
                    turn_id: self.turn_id,
                    context: format!("{}{}", context, section.prompt()),
                    target,
                })
            })
            .collect())
    }
}

/// Walks a dialogue in (user, system) pairs, threading the context forward.
#[derive(Debug, Clone, Default)]
pub struct DialogueLinearizer {
    config: LinearizerConfig,
}

impl DialogueLinearizer {
    pub fn new(config: LinearizerConfig) -> Self {
        Self { config }
    }

    /// Linearize a whole dialogue. A trailing user turn without a reply
    /// yields a turn with no response.
    pub fn linearize(&self, dialogue: &DstcDialogue) -> Vec<Turn> {
        let mut turns: Vec<Turn> = Vec::with_capacity(dialogue.turns.len().div_ceil(2));
        for (turn_id, pair) in dialogue.turns.chunks(2).enumerate() {
            let user_turn = &pair[0];
            let system_turn = pair.get(1);
            if user_turn.speaker != Speaker::User {
                warn!(
                    "Dialogue {} turn {} starts with a {:?} utterance",
                    dialogue.dialogue_id, turn_id, user_turn.speaker
                );
            }
            let turn = self.prepare_turn(
                user_turn,
                system_turn,
                turns.last(),
                &dialogue.dialogue_id,
                turn_id,
            );
            turns.push(turn);
        }
        debug!("Linearized dialogue {} into {} turns", dialogue.dialogue_id, turns.len());
        turns
    }

    fn prepare_turn(
        &self,
        user_turn: &DstcTurn,
        system_turn: Option<&DstcTurn>,
        prev_turn: Option<&Turn>,
        dialog_id: &str,
        turn_id: usize,
    ) -> Turn {
        Turn {
            context: self.prepare_context(user_turn, system_turn, prev_turn),
            target: self.prepare_target(user_turn, system_turn),
            dialog_id: dialog_id.to_string(),
            turn_id,
        }
    }

    fn prepare_context(
        &self,
        user_turn: &DstcTurn,
        system_turn: Option<&DstcTurn>,
        prev_turn: Option<&Turn>,
    ) -> Context {
        let system_utterance = system_turn.map(|turn| turn.utterance.as_str());
        match prev_turn {
            Some(prev) => prev.context.advance(Some(&user_turn.utterance), system_utterance),
            None => Context::new(self.config.context_max_length)
                .advance(Some(&user_turn.utterance), system_utterance),
        }
    }

    fn prepare_target(&self, user_turn: &DstcTurn, system_turn: Option<&DstcTurn>) -> Target {
        let mut target = Target::new(
            prepare_beliefs(user_turn),
            prepare_actions(user_turn, system_turn),
            system_turn.map(|turn| self.prepare_response(turn)),
        );
        if self.config.with_active_intent {
            target.active_intent = prepare_active_intent(user_turn);
        }
        if self.config.with_requested_slots {
            target.requested_slots = Some(prepare_requested_slots(user_turn));
        }
        target
    }

    fn prepare_response(&self, system_turn: &DstcTurn) -> String {
        if self.config.delexicalize {
            delexicalize_utterance(&system_turn.utterance, &system_turn.frames)
        } else {
            system_turn.utterance.clone()
        }
    }
}

fn prepare_beliefs(user_turn: &DstcTurn) -> Vec<Belief> {
    let mut beliefs = Vec::new();
    for frame in &user_turn.frames {
        let Some(state) = &frame.state else {
            continue;
        };
        let domain = dstc_service_name(&frame.service);
        for (slot_name, values) in &state.slot_values {
            beliefs.push(Belief::new(domain, slot_name, values.join(" ")));
        }
    }
    beliefs
}

/// User acts first (payload in `values`), then system acts (payload in `slot_name`).
fn prepare_actions(user_turn: &DstcTurn, system_turn: Option<&DstcTurn>) -> Vec<Action> {
    let mut actions = Vec::new();
    for frame in &user_turn.frames {
        let domain = dstc_service_name(&frame.service);
        for action in &frame.actions {
            actions.push(Action::with_values(domain, &action.act, action.values.join(" ")));
        }
    }
    if let Some(system_turn) = system_turn {
        for frame in &system_turn.frames {
            let domain = dstc_service_name(&frame.service);
            for action in &frame.actions {
                actions.push(Action::with_slot(domain, &action.act, &action.slot));
            }
        }
    }
    actions
}

fn prepare_active_intent(user_turn: &DstcTurn) -> Option<String> {
    user_turn
        .frames
        .iter()
        .filter_map(|frame| frame.state.as_ref())
        .map(|state| state.active_intent.as_str())
        .find(|intent| !intent.is_empty() && *intent != NO_INTENT)
        .map(str::to_string)
}

fn prepare_requested_slots(user_turn: &DstcTurn) -> Vec<RequestedSlot> {
    user_turn
        .frames
        .iter()
        .filter_map(|frame| {
            frame
                .state
                .as_ref()
                .map(|state| (dstc_service_name(&frame.service), state))
        })
        .flat_map(|(domain, state)| {
            state
                .requested_slots
                .iter()
                .map(move |slot| RequestedSlot::new(domain, slot))
        })
        .collect()
}

/// Replace annotated slot spans with `<domain_slot>` placeholders.
///
/// Spans are character offsets. Invalid or overlapping spans are skipped.
pub fn delexicalize_utterance(utterance: &str, frames: &[DstcFrame]) -> String {
    let mut spans: Vec<(usize, usize, String)> = frames
        .iter()
        .flat_map(|frame| {
            let domain = dstc_service_name(&frame.service);
            frame.slots.iter().map(move |span| {
                (span.start, span.exclusive_end, format!("<{}_{}>", domain, span.slot))
            })
        })
        .collect();
    // Replace back to front so earlier offsets stay valid
    spans.sort_by(|a, b| b.0.cmp(&a.0));

    let mut boundaries: Vec<usize> = utterance.char_indices().map(|(i, _)| i).collect();
    boundaries.push(utterance.len());
    let char_count = boundaries.len() - 1;

    let mut out = utterance.to_string();
    let mut replaced_from = char_count;
    for (start, end, placeholder) in spans {
        if start >= end || end > replaced_from {
            debug!("Skipping slot span {}..{} in {:?}", start, end, utterance);
            continue;
        }
        out.replace_range(boundaries[start]..boundaries[end], &placeholder);
        replaced_from = start;
    }
    out
}
