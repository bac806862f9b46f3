//! Transcript accumulation and the conversation log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// Attachment shown alongside an upload entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub mime_type: String,
    /// Base64 content, kept for image previews only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub is_url: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileMetadata>,
}

impl TranscriptionEntry {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: Utc::now(),
            file: None,
        }
    }

    pub fn with_file(mut self, file: FileMetadata) -> Self {
        self.file = Some(file);
        self
    }
}

/// Partial transcription of the current turn, one buffer per direction.
#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    input: String,
    output: String,
}

impl TranscriptBuffer {
    pub fn push_input(&mut self, text: &str) {
        self.input.push_str(text);
    }

    pub fn push_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    /// Drain both buffers at turn end. User text comes before model text;
    /// buffers that are blank after trimming produce nothing.
    pub fn take_turn(&mut self) -> Vec<TranscriptionEntry> {
        let input = std::mem::take(&mut self.input);
        let output = std::mem::take(&mut self.output);

        [(Role::User, input), (Role::Model, output)]
            .into_iter()
            .filter_map(|(role, text)| {
                let text = text.trim();
                (!text.is_empty()).then(|| TranscriptionEntry::new(role, text))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }
}

/// Append-only conversation history; insertion order is display order.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    entries: Vec<TranscriptionEntry>,
}

impl TranscriptLog {
    pub fn push(&mut self, entry: TranscriptionEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TranscriptionEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
