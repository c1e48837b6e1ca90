// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// The selfie the user picked, kept as a displayable data URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedImage {
    pub file_name: Option<String>,
    pub data_url: String,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A produced headshot. Becomes the input of the next edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultImage {
    pub data_url: String,
    pub mime_type: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StylePreset {
    pub id: String,
    pub label: String,
    pub description: String,
    #[serde(alias = "prompt")]
    pub prompt_text: String,
    pub preview_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowState {
    Idle,
    Uploading,
    Generating,
    Editing,
    Result,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "IDLE",
            WorkflowState::Uploading => "UPLOADING",
            WorkflowState::Generating => "GENERATING",
            WorkflowState::Editing => "EDITING",
            WorkflowState::Result => "RESULT",
        }
    }

    /// A transform call is outstanding.
    pub fn is_busy(&self) -> bool {
        matches!(self, WorkflowState::Generating | WorkflowState::Editing)
    }

    /// Transition table. Every state may fall back to `Idle` (reset).
    pub fn can_transition_to(&self, next: WorkflowState) -> bool {
        use WorkflowState::*;

        match (self, next) {
            (_, Idle) => true,
            (Idle, Uploading) | (Result, Uploading) => true,
            (Uploading, Result) => true,
            (Idle, Generating) => true,
            (Generating, Result) => true,
            (Result, Editing) => true,
            (Editing, Result) => true,
            _ => false,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call to the image transform service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    /// Raw base64 payload, without the `data:` prefix.
    pub base64_image: String,
    pub mime_type: String,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StyleSummary {
    pub id: String,
    pub label: String,
}

/// What the browser renders from.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub session_id: Option<Uuid>,
    pub state: WorkflowState,
    pub uploaded_image: Option<UploadedImage>,
    pub selected_style: Option<StyleSummary>,
    pub result_image: Option<ResultImage>,
    pub edit_prompt: String,
    pub error: Option<String>,
    pub progress_message: Option<String>,
    pub can_generate: bool,
    pub can_edit: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectStyleBody {
    pub style_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EditPromptBody {
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyEditBody {
    pub prompt: Option<String>,
}
