//! Inference record -> Gemini tuning example conversion.

use crate::error::ConversionError;
use crate::gemini::{Content, ConvertedExample, FunctionCall, FunctionResponse, GeminiRole, Part};
use crate::record::{ContentBlock, InferenceRecord, Role};
use serde_json::json;
use tracing::{debug, warn};

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Where a block is being rendered from; the output only allows a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Message(Role),
    Output,
}

impl Origin {
    fn role(self) -> Role {
        match self {
            Self::Message(role) => role,
            Self::Output => Role::Assistant,
        }
    }
}

/// A block that cannot appear where it was found.
#[derive(Debug, Clone, Copy)]
struct Unsupported {
    block: &'static str,
    origin: Origin,
}

enum Rendered {
    Part(Part),
    Unsupported(Unsupported),
}

fn render_block(block: &ContentBlock, origin: Origin) -> Result<Rendered, ConversionError> {
    let part = match (block, origin) {
        (ContentBlock::Text { text }, _) => Part::text(text.clone()),
        (ContentBlock::RawText { value }, Origin::Message(_)) => Part::text(value.clone()),
        (ContentBlock::Thought { text }, _) => Part::text(format!("{THINK_OPEN}{text}{THINK_CLOSE}")),
        (ContentBlock::ToolCall { name, arguments }, Origin::Message(Role::Assistant) | Origin::Output) => {
            Part::FunctionCall {
                function_call: FunctionCall { name: name.clone(), args: arguments.normalize(name)? },
            }
        }
        (ContentBlock::ToolResult { name, result }, Origin::Message(Role::User)) => Part::FunctionResponse {
            function_response: FunctionResponse { name: name.clone(), response: json!({ "result": result }) },
        },
        (
            ContentBlock::RawText { .. }
            | ContentBlock::ToolCall { .. }
            | ContentBlock::ToolResult { .. }
            | ContentBlock::Unknown,
            _,
        ) => return Ok(Rendered::Unsupported(Unsupported { block: block.kind(), origin })),
    };
    Ok(Rendered::Part(part))
}

fn render_turn(blocks: &[ContentBlock], origin: Origin) -> Result<Result<Content, Unsupported>, ConversionError> {
    let mut parts = Vec::with_capacity(blocks.len());
    for block in blocks {
        match render_block(block, origin)? {
            Rendered::Part(part) => parts.push(part),
            Rendered::Unsupported(unsupported) => return Ok(Err(unsupported)),
        }
    }
    Ok(Ok(Content { role: origin.role().into(), parts }))
}

/// Render every message plus the output into turns, without merging.
///
/// `Ok(None)` means the record holds a block that cannot be represented and
/// should be skipped.
pub fn render_turns(record: &InferenceRecord) -> Result<Option<Vec<Content>>, ConversionError> {
    let mut turns = Vec::with_capacity(record.messages.len() + 1);

    let origins = record
        .messages
        .iter()
        .map(|m| (m.content.as_slice(), Origin::Message(m.role)))
        .chain(std::iter::once((record.output.as_slice(), Origin::Output)));

    for (blocks, origin) in origins {
        match render_turn(blocks, origin)? {
            Ok(turn) => turns.push(turn),
            Err(Unsupported { block, origin }) => {
                let location = match origin {
                    Origin::Message(role) => format!("{role} message"),
                    Origin::Output => "output".to_string(),
                };
                warn!(
                    episode_id = %record.episode_id,
                    block,
                    location = %location,
                    "Skipping record with unsupported content block"
                );
                return Ok(None);
            }
        }
    }

    Ok(Some(turns))
}

/// Merge adjacent turns that share a role, concatenating their parts in order.
#[must_use]
pub fn merge_turns(turns: Vec<Content>) -> Vec<Content> {
    let mut merged: Vec<Content> = Vec::with_capacity(turns.len());
    for turn in turns {
        match merged.last_mut() {
            Some(last) if last.role == turn.role => last.parts.extend(turn.parts),
            _ => merged.push(turn),
        }
    }
    merged
}

/// Convert one stored inference into a tuning example.
///
/// Returns `Ok(None)` when the record contains a block that is not valid where
/// it appears (or has no output at all), and `Err` when tool-call arguments
/// cannot be parsed.
pub fn convert(record: &InferenceRecord) -> Result<Option<ConvertedExample>, ConversionError> {
    if record.output.is_empty() {
        warn!(episode_id = %record.episode_id, "Skipping record with empty output");
        return Ok(None);
    }

    let system_instruction = record
        .system
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| Content { role: GeminiRole::System, parts: vec![Part::text(s)] });

    let Some(turns) = render_turns(record)? else {
        return Ok(None);
    };

    Ok(Some(ConvertedExample {
        turns: merge_turns(turns),
        system_instruction,
        episode_id: record.episode_id.clone(),
    }))
}

/// Outcome of converting a batch of records.
#[derive(Debug, Default)]
pub struct ConversionReport {
    pub examples: Vec<ConvertedExample>,
    /// Records dropped for holding unsupported blocks.
    pub skipped: usize,
    /// Records dropped because conversion failed outright.
    pub failed: usize,
}

impl ConversionReport {
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.skipped + self.failed
    }
}

/// Convert a batch, best effort per record.
pub fn convert_all<'a, I>(records: I) -> ConversionReport
where
    I: IntoIterator<Item = &'a InferenceRecord>,
{
    let mut report = ConversionReport::default();
    for record in records {
        match convert(record) {
            Ok(Some(example)) => report.examples.push(example),
            Ok(None) => report.skipped += 1,
            Err(e) => {
                warn!(episode_id = %record.episode_id, error = %e, "Failed to convert record");
                report.failed += 1;
            }
        }
    }
    debug!(
        converted = report.examples.len(),
        skipped = report.skipped,
        failed = report.failed,
        "Conversion finished"
    );
    report
}
