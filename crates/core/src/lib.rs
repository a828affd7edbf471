//! Core serialization logic for SimpleTOD-style dialogue corpora.
//!
//! This crate provides the `DialogueLinearizer` which converts annotated
//! schema-guided dialogues into flat (context, target) text pairs suitable
//! for training a causal language model, together with the best-effort
//! decoders and metrics used to score generated targets.

mod context;
mod decode;
mod domains;
mod dstc;
mod error;
mod helpers;
mod linearizer;
pub mod metrics;
pub mod pipeline;
mod target;
pub mod tokens;
mod values;

pub use context::Context;
pub use decode::{decode_items, section_text, DecodedTarget};
pub use domains::{dialogue_in_domains, DomainSetting, SEEN_DOMAINS, UNSEEN_DOMAINS};
pub use dstc::{
    dstc_service_name, DstcAction, DstcDialogue, DstcFrame, DstcSlotSpan, DstcState, DstcTurn,
    Speaker,
};
pub use error::{Result, SerializerError};
pub use helpers::{
    all_text_between, remove_padding, remove_tokens_from_text, split_items, text_between,
};
pub use linearizer::{
    delexicalize_utterance, DialogueLinearizer, LinearizerConfig, Turn, TurnCsvRow,
};
pub use metrics::{evaluate_predictions, MetricCollection, MetricReport, PredictionRow};
pub use pipeline::{
    csv_output_path, discover_dialogue_files, process_dialogue_file, process_step,
    read_dialogue_file, read_prediction_rows, read_turn_rows, run_pipeline, turns_to_rows,
    write_turn_rows, PipelineConfig, PipelineResult, Step, StepOutput, StepResult,
};
pub use target::Target;
pub use tokens::{Section, SpecialToken, TokenizerToken};
pub use values::{Action, Belief, ItemCodec, RequestedSlot};

/// Default number of past utterances kept per speaker in a context.
pub const DEFAULT_CONTEXT_MAX_LENGTH: usize = 10;
