//! Pipeline for turning raw dialogue files into flat CSV corpora.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::domains::{dialogue_in_domains, DomainSetting};
use crate::dstc::DstcDialogue;
use crate::error::{Result, SerializerError};
use crate::linearizer::{DialogueLinearizer, LinearizerConfig, Turn, TurnCsvRow};
use crate::metrics::PredictionRow;
use crate::tokens::DELEXICALIZED;

/// Dataset split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Train,
    Dev,
    Test,
}

impl Step {
    pub const ALL: [Step; 3] = [Step::Train, Step::Dev, Step::Test];

    pub fn as_str(self) -> &'static str {
        match self {
            Step::Train => "train",
            Step::Dev => "dev",
            Step::Test => "test",
        }
    }
}

impl FromStr for Step {
    type Err = SerializerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "train" => Ok(Step::Train),
            "dev" => Ok(Step::Dev),
            "test" => Ok(Step::Test),
            other => Err(SerializerError::UnknownStep(other.to_string())),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory holding one sub-directory of `dialogues_*.json` per step.
    pub raw_data_root: PathBuf,
    pub out_root: PathBuf,
    pub steps: Vec<Step>,
    /// Dialogue limit per step, aligned with `steps`. Missing entries mean no limit.
    pub num_dialogs: Vec<usize>,
    pub domain_setting: DomainSetting,
    /// Domains used with [`DomainSetting::Custom`].
    pub custom_domains: Vec<String>,
    /// Emit one row per target section instead of one row per turn.
    pub multi_task: bool,
    /// Rewrite outputs that already exist.
    pub overwrite: bool,
    pub linearizer: LinearizerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data_root: PathBuf::from("data/dstc8-schema-guided-dialogue"),
            out_root: PathBuf::from("processed_data/simple_tod"),
            steps: Step::ALL.to_vec(),
            num_dialogs: Vec::new(),
            domain_setting: DomainSetting::All,
            custom_domains: Vec::new(),
            multi_task: false,
            overwrite: false,
            linearizer: LinearizerConfig::default(),
        }
    }
}

impl PipelineConfig {
    fn dialog_limit(&self, step: Step) -> Option<usize> {
        let idx = self.steps.iter().position(|s| *s == step)?;
        self.num_dialogs.get(idx).copied()
    }

    fn domains(&self) -> Vec<String> {
        self.domain_setting.domains(&self.custom_domains)
    }
}

/// Turns produced for one step.
#[derive(Debug)]
pub struct StepOutput {
    pub dialogues: usize,
    pub turns: Vec<Turn>,
}

/// Summary of one written (or skipped) step.
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step: Step,
    pub path: PathBuf,
    pub dialogues: usize,
    pub rows: usize,
    pub skipped: bool,
}

/// Result of processing all steps.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub steps: Vec<StepResult>,
    pub total_dialogues: usize,
    pub total_rows: usize,
}

/// Discover all `dialogues_*.json` files under a directory, sorted.
pub fn discover_dialogue_files(root: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            name.starts_with("dialogues_") && name.ends_with(".json")
        })
        .map(|e| e.path().to_path_buf())
        .collect();
    paths.sort();
    paths
}

/// Read every dialogue of one JSON file.
pub fn read_dialogue_file(path: &Path) -> Result<Vec<DstcDialogue>> {
    let content = std::fs::read_to_string(path).map_err(|source| SerializerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| SerializerError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Linearize the dialogues of one file that fall inside `domains`.
///
/// Returns one turn list per kept dialogue, in file order.
pub fn process_dialogue_file(
    path: &Path,
    linearizer: &DialogueLinearizer,
    domains: &[String],
) -> Result<Vec<Vec<Turn>>> {
    let dialogues = read_dialogue_file(path)?;
    let total = dialogues.len();
    let kept: Vec<Vec<Turn>> = dialogues
        .iter()
        .filter(|d| dialogue_in_domains(d, domains))
        .map(|d| linearizer.linearize(d))
        .collect();
    debug!("{:?}: kept {}/{} dialogues", path, kept.len(), total);
    Ok(kept)
}

/// Process every dialogue file of a step in parallel.
///
/// Files are linearized independently; results keep file order, so the
/// dialogue limit always selects the same dialogues. Any failing file
/// aborts the step.
pub fn process_step(config: &PipelineConfig, step: Step) -> Result<StepOutput> {
    let step_root = config.raw_data_root.join(step.as_str());
    let files = discover_dialogue_files(&step_root);
    if files.is_empty() {
        return Err(SerializerError::NoDialogueFiles(step_root));
    }

    let linearizer = DialogueLinearizer::new(config.linearizer.clone());
    let domains = config.domains();
    let total_files = files.len();
    let processed_count = AtomicUsize::new(0);

    let per_file: Vec<Vec<Vec<Turn>>> = files
        .par_iter()
        .map(|path| {
            let result = process_dialogue_file(path, &linearizer, &domains);
            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 || count == total_files {
                info!("[{}] Processed {}/{} files...", step, count, total_files);
            }
            result
        })
        .collect::<Result<_>>()?;

    let limit = config.dialog_limit(step).unwrap_or(usize::MAX);
    let dialogues: Vec<Vec<Turn>> = per_file.into_iter().flatten().take(limit).collect();
    let dialogue_count = dialogues.len();
    Ok(StepOutput {
        dialogues: dialogue_count,
        turns: dialogues.into_iter().flatten().collect(),
    })
}

/// Flatten turns into CSV rows.
pub fn turns_to_rows(turns: &[Turn], multi_task: bool) -> Result<Vec<TurnCsvRow>> {
    if multi_task {
        let mut rows = Vec::new();
        for turn in turns {
            rows.extend(turn.to_multi_task_rows()?);
        }
        Ok(rows)
    } else {
        turns.iter().map(Turn::to_csv_row).collect()
    }
}

/// Output path of a step; the file name records the settings that shaped it.
pub fn csv_output_path(config: &PipelineConfig, step: Step) -> PathBuf {
    let dialogs = config
        .dialog_limit(step)
        .map_or_else(|| "all".to_string(), |n| n.to_string());
    let domains = match config.domain_setting {
        DomainSetting::Custom => config.custom_domains.join("_"),
        setting => setting.as_str().to_string(),
    };
    let file_name = format!(
        "multi_task_{}_turns_{}_dialogs_{}{}_{}.csv",
        config.multi_task,
        config.linearizer.context_max_length,
        dialogs,
        if config.linearizer.delexicalize { DELEXICALIZED } else { "" },
        domains
    );
    config.out_root.join(step.as_str()).join(file_name)
}

/// Write rows with a `dialog_id,turn_id,context,target` header.
pub fn write_turn_rows(path: &Path, rows: &[TurnCsvRow]) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| SerializerError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush().map_err(|source| SerializerError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(rows.len())
}

pub fn read_turn_rows(path: &Path) -> Result<Vec<TurnCsvRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows: Vec<TurnCsvRow> = reader.deserialize().collect::<std::result::Result<_, _>>()?;
    Ok(rows)
}

/// Read a `target,prediction` file written by inference.
pub fn read_prediction_rows(path: &Path) -> Result<Vec<PredictionRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows: Vec<PredictionRow> = reader.deserialize().collect::<std::result::Result<_, _>>()?;
    Ok(rows)
}

/// Prepare every configured step.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineResult> {
    let mut steps = Vec::with_capacity(config.steps.len());
    for &step in &config.steps {
        let path = csv_output_path(config, step);
        if path.exists() && !config.overwrite {
            info!("[{}] {:?} exists, skipping", step, path);
            steps.push(StepResult {
                step,
                path,
                dialogues: 0,
                rows: 0,
                skipped: true,
            });
            continue;
        }

        let output = process_step(config, step)?;
        let rows = turns_to_rows(&output.turns, config.multi_task)?;
        let written = write_turn_rows(&path, &rows)?;
        info!(
            "[{}] Wrote {} rows from {} dialogues to {:?}",
            step, written, output.dialogues, path
        );
        steps.push(StepResult {
            step,
            path,
            dialogues: output.dialogues,
            rows: written,
            skipped: false,
        });
    }

    Ok(PipelineResult {
        total_dialogues: steps.iter().map(|s| s.dialogues).sum(),
        total_rows: steps.iter().map(|s| s.rows).sum(),
        steps,
    })
}
