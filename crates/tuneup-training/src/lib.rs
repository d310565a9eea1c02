//! Tuneup Training
//!
//! Backend-agnostic primitives for turning logged inferences into a tuning run:
//! - Reading stored inference records (`InferenceSource`)
//! - Converting them to the Gemini tuning format (`convert`)
//! - Splitting by episode and writing JSONL datasets
//! - Publishing datasets to object storage (`ObjectStore`)
//! - Submitting and polling tuning jobs (`FineTuneClient`)

pub mod convert;
pub mod dataset;
pub mod error;
pub mod gemini;
pub mod job;
pub mod layout;
pub mod manifest;
pub mod progress;
pub mod publish;
pub mod query;
pub mod record;
pub mod split;
pub mod tuning;

pub use convert::{convert, convert_all, merge_turns, ConversionReport};
pub use dataset::{compute_dataset_id, read_jsonl_dataset, validate_examples, write_jsonl_dataset, DatasetId};
pub use error::{ConversionError, TrainingError, TrainingResult};
pub use gemini::{Content, ConvertedExample, GeminiRole, Part};
pub use job::{RunId, TuningHyperParams, TuningJobId, TuningJobSpec};
pub use layout::ExportLayout;
pub use manifest::{ConversionCounts, ExportManifest, JobOutcome, SplitArtifact};
pub use progress::{ProgressEvent, ProgressSink, RecordingProgressSink, StdoutProgressSink, TracingProgressSink};
pub use publish::{publish, unique_object_name, LocalObjectStore, ObjectStore};
pub use query::{Comparison, FeedbackValue, InferenceQuery, InferenceSource, JsonlInferenceSource, MetricFilter, MetricLevel};
pub use record::{ContentBlock, EpisodeId, InferenceRecord, Message, Role, ToolArguments};
pub use split::{split_by_episode, DatasetSplit};
pub use tuning::{poll_until_terminal, FineTuneClient, JobState, JobStatus, PollOptions};
