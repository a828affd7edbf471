//! Sliding-window dialogue history fed to the model as its prompt.

use std::collections::VecDeque;

use crate::error::{Result, SerializerError};
use crate::tokens::SpecialToken;
use crate::DEFAULT_CONTEXT_MAX_LENGTH;

/// Bounded history of prior user and system utterances for one turn.
///
/// Each window keeps at most `max_length` entries, evicting the oldest.
/// The system reply of a turn is staged in `next_system_utterance` and only
/// enters the history on the following turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    max_length: usize,
    user_utterances: VecDeque<String>,
    system_utterances: VecDeque<String>,
    next_system_utterance: Option<String>,
    current_user_utterance: Option<String>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new(DEFAULT_CONTEXT_MAX_LENGTH)
    }
}

impl Context {
    /// Create an empty context whose windows hold `max_length` utterances.
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            user_utterances: VecDeque::with_capacity(max_length),
            system_utterances: VecDeque::with_capacity(max_length),
            next_system_utterance: None,
            current_user_utterance: None,
        }
    }

    pub fn user_utterances(&self) -> &VecDeque<String> {
        &self.user_utterances
    }

    pub fn system_utterances(&self) -> &VecDeque<String> {
        &self.system_utterances
    }

    pub fn next_system_utterance(&self) -> Option<&str> {
        self.next_system_utterance.as_deref()
    }

    pub fn current_user_utterance(&self) -> Option<&str> {
        self.current_user_utterance.as_deref()
    }

    pub fn set_current_user_utterance(&mut self, utterance: impl Into<String>) {
        self.current_user_utterance = Some(utterance.into());
    }

    pub fn append_user(&mut self, utterance: impl Into<String>) {
        push_bounded(&mut self.user_utterances, utterance.into(), self.max_length);
    }

    pub fn append_system(&mut self, utterance: impl Into<String>) {
        push_bounded(&mut self.system_utterances, utterance.into(), self.max_length);
    }

    /// Produce the context of the next turn.
    ///
    /// The returned context is an independent copy. The previous turn's
    /// user utterance and staged system reply move into history, `user`
    /// becomes the current utterance and `system` is staged.
    pub fn advance(&self, user: Option<&str>, system: Option<&str>) -> Context {
        let mut next = self.clone();
        if let Some(previous_user) = next.current_user_utterance.take() {
            next.append_user(previous_user);
        }
        if let Some(previous_system) = next.next_system_utterance.take() {
            next.append_system(previous_system);
        }
        if let Some(user) = user {
            next.current_user_utterance = Some(user.to_string());
        }
        next.next_system_utterance = system.map(str::to_string);
        next
    }

    /// Encode the history as `<|begincontext|>` ... `<|endcontext|>`.
    ///
    /// History is interleaved user-then-system per index; empty entries are
    /// skipped. Fails when no current user utterance has been set.
    pub fn encode(&self) -> Result<String> {
        let current = self
            .current_user_utterance
            .as_deref()
            .ok_or(SerializerError::MissingUserUtterance)?;

        let mut out = String::from(SpecialToken::BeginContext.as_str());
        let pairs = self.user_utterances.len().max(self.system_utterances.len());
        for idx in 0..pairs {
            let user = self.user_utterances.get(idx).map_or("", String::as_str);
            let system = self.system_utterances.get(idx).map_or("", String::as_str);
            if !user.is_empty() {
                out.push_str(SpecialToken::User.as_str());
                out.push_str(user);
            }
            if !system.is_empty() {
                out.push_str(SpecialToken::System.as_str());
                out.push_str(system);
            }
        }
        out.push_str(SpecialToken::BeginLastUserUtterance.as_str());
        out.push_str(current);
        out.push_str(SpecialToken::EndLastUserUtterance.as_str());
        out.push_str(SpecialToken::EndContext.as_str());
        Ok(out)
    }
}

fn push_bounded(window: &mut VecDeque<String>, utterance: String, max_length: usize) {
    if max_length == 0 {
        return;
    }
    while window.len() >= max_length {
        window.pop_front();
    }
    window.push_back(utterance);
}
