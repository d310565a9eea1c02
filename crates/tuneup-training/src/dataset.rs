use crate::error::{TrainingError, TrainingResult};
use crate::gemini::{ConvertedExample, OwnedTuningRow};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::Path;

/// Stable identifier for a dataset (content hash).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetId(pub String);

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

pub fn compute_dataset_id(examples: &[ConvertedExample]) -> TrainingResult<DatasetId> {
    let mut hasher = Sha256::new();

    for ex in examples {
        let bytes = serde_json::to_vec(&ex.to_row())?;
        hasher.update(bytes);
        hasher.update(b"\n");
    }

    Ok(DatasetId(hex::encode(hasher.finalize())))
}

pub fn validate_examples(examples: &[ConvertedExample]) -> TrainingResult<()> {
    if examples.is_empty() {
        return Err(TrainingError::Dataset("dataset must not be empty".to_string()));
    }
    for (idx, ex) in examples.iter().enumerate() {
        if ex.turns.is_empty() {
            return Err(TrainingError::Dataset(format!("example[{idx}] has no turns")));
        }
    }
    Ok(())
}

/// Write one tuning row per line.
pub fn write_jsonl<W: Write>(mut writer: W, examples: &[ConvertedExample]) -> TrainingResult<()> {
    for ex in examples {
        serde_json::to_writer(&mut writer, &ex.to_row())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_jsonl_dataset(path: &Path, examples: &[ConvertedExample]) -> TrainingResult<()> {
    let file = std::fs::File::create(path)?;
    write_jsonl(std::io::BufWriter::new(file), examples)
}

pub fn read_jsonl_dataset(path: &Path) -> TrainingResult<Vec<OwnedTuningRow>> {
    let contents = std::fs::read_to_string(path)?;
    let mut rows = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row: OwnedTuningRow = serde_json::from_str(line).map_err(|e| {
            TrainingError::Dataset(format!("failed to parse jsonl line {}: {}", idx + 1, e))
        })?;
        rows.push(row);
    }

    Ok(rows)
}
