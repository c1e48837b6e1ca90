// src/workflow.rs
//! The headshot wizard: upload, pick a style, generate, then refine.
//!
//! All state changes go through [`WorkflowState::can_transition_to`]. Transform
//! calls are split into a `begin_*` step that gates and marks the controller
//! busy, and [`WorkflowController::complete`] that applies the outcome. Callers
//! sharing a controller release their lock between the two, which is where the
//! external service is awaited.

use crate::data_url;
use crate::errors::HeadshotError;
use crate::models::*;
use crate::services::ImageTransformer;
use crate::services::session_store::SharedController;
use crate::styles::StyleCatalog;
use chrono::Utc;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const INVALID_UPLOAD_MESSAGE: &str = "Please upload an image file.";
pub const GENERATION_FALLBACK_MESSAGE: &str = "Failed to generate headshot. Please try again.";
pub const EDIT_FALLBACK_MESSAGE: &str = "Failed to apply edit. Try a different prompt.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    Generation,
    Edit,
}

impl TransformKind {
    fn busy_state(self) -> WorkflowState {
        match self {
            TransformKind::Generation => WorkflowState::Generating,
            TransformKind::Edit => WorkflowState::Editing,
        }
    }

    fn fallback_message(self) -> &'static str {
        match self {
            TransformKind::Generation => GENERATION_FALLBACK_MESSAGE,
            TransformKind::Edit => EDIT_FALLBACK_MESSAGE,
        }
    }
}

/// Issued by `begin_upload`; redeemed by `complete_upload` or `abort_upload`.
#[derive(Debug, Clone)]
pub struct UploadTicket {
    epoch: u64,
    file_name: Option<String>,
    mime_type: String,
}

/// An outstanding transform call.
#[derive(Debug, Clone)]
pub struct PendingTransform {
    epoch: u64,
    pub kind: TransformKind,
    pub request: TransformRequest,
}

#[derive(Debug)]
pub struct WorkflowController {
    catalog: Arc<StyleCatalog>,
    state: WorkflowState,
    uploaded: Option<UploadedImage>,
    selected_style: Option<StylePreset>,
    result: Option<ResultImage>,
    edit_prompt: String,
    error: Option<String>,
    progress: Option<String>,
    // Bumped on reset so completions issued earlier are dropped.
    epoch: u64,
}

impl WorkflowController {
    pub fn new(catalog: Arc<StyleCatalog>) -> Self {
        Self {
            catalog,
            state: WorkflowState::Idle,
            uploaded: None,
            selected_style: None,
            result: None,
            edit_prompt: String::new(),
            error: None,
            progress: None,
            epoch: 0,
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.state
    }

    pub fn uploaded_image(&self) -> Option<&UploadedImage> {
        self.uploaded.as_ref()
    }

    pub fn selected_style(&self) -> Option<&StylePreset> {
        self.selected_style.as_ref()
    }

    pub fn result_image(&self) -> Option<&ResultImage> {
        self.result.as_ref()
    }

    pub fn edit_prompt(&self) -> &str {
        &self.edit_prompt
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Display-only text shown while a transform call is outstanding.
    pub fn progress_message(&self) -> Option<&str> {
        self.progress.as_deref()
    }

    fn transition(&mut self, next: WorkflowState) -> Result<(), HeadshotError> {
        if !self.state.can_transition_to(next) {
            return Err(HeadshotError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        debug!("Workflow {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }

    pub fn begin_upload(
        &mut self,
        file_name: Option<String>,
        declared_mime: &str,
    ) -> Result<UploadTicket, HeadshotError> {
        if self.state.is_busy() {
            return Err(HeadshotError::NotReady(format!(
                "Cannot upload a photo while {}",
                self.state
            )));
        }

        let mime_type = declared_mime.trim().to_ascii_lowercase();
        if !mime_type.starts_with("image/") {
            info!("Rejected upload with declared type {:?}", declared_mime);
            self.error = Some(INVALID_UPLOAD_MESSAGE.to_string());
            return Err(HeadshotError::Validation(INVALID_UPLOAD_MESSAGE.to_string()));
        }

        self.transition(WorkflowState::Uploading)?;
        self.error = None;

        Ok(UploadTicket {
            epoch: self.epoch,
            file_name,
            mime_type,
        })
    }

    pub fn complete_upload(
        &mut self,
        ticket: UploadTicket,
        bytes: &[u8],
    ) -> Result<(), HeadshotError> {
        self.check_upload_ticket(&ticket)?;

        if bytes.is_empty() {
            let message = "The selected file is empty.".to_string();
            self.abort_upload(ticket, message.clone());
            return Err(HeadshotError::Validation(message));
        }

        self.uploaded = Some(UploadedImage {
            file_name: ticket.file_name,
            data_url: data_url::encode(&ticket.mime_type, bytes),
            mime_type: ticket.mime_type,
            uploaded_at: Utc::now(),
        });
        // A new photo starts a fresh headshot.
        self.result = None;
        self.edit_prompt.clear();
        self.transition(WorkflowState::Idle)?;

        info!("Stored uploaded photo ({} bytes)", bytes.len());
        Ok(())
    }

    /// The file could not be read. Previous photo and result are kept.
    pub fn abort_upload(&mut self, ticket: UploadTicket, message: String) {
        if self.check_upload_ticket(&ticket).is_err() {
            return;
        }
        warn!("Upload aborted: {}", message);
        self.error = Some(message);
        let next = if self.result.is_some() {
            WorkflowState::Result
        } else {
            WorkflowState::Idle
        };
        if let Err(e) = self.transition(next) {
            warn!("{}", e);
        }
    }

    fn check_upload_ticket(&self, ticket: &UploadTicket) -> Result<(), HeadshotError> {
        if ticket.epoch != self.epoch || self.state != WorkflowState::Uploading {
            return Err(HeadshotError::NotReady(
                "Upload was superseded".to_string(),
            ));
        }
        Ok(())
    }

    /// "Change photo": drop the photo before anything was generated.
    pub fn discard_upload(&mut self) -> Result<(), HeadshotError> {
        if self.state != WorkflowState::Idle {
            return Err(HeadshotError::NotReady(format!(
                "Cannot change the photo while {}",
                self.state
            )));
        }
        self.uploaded = None;
        self.error = None;
        Ok(())
    }

    pub fn select_style(&mut self, style_id: &str) -> Result<&StylePreset, HeadshotError> {
        if self.state != WorkflowState::Idle {
            return Err(HeadshotError::NotReady(format!(
                "Cannot change the style while {}",
                self.state
            )));
        }

        let preset = self
            .catalog
            .get(style_id)
            .cloned()
            .ok_or_else(|| HeadshotError::NotFound(format!("style {}", style_id)))?;

        debug!("Selected style {}", preset.id);
        let selected = &*self.selected_style.insert(preset);
        Ok(selected)
    }

    pub fn can_generate(&self) -> bool {
        self.state == WorkflowState::Idle
            && self.selected_style.is_some()
            && self
                .uploaded
                .as_ref()
                .is_some_and(|image| !image.mime_type.is_empty())
    }

    /// Returns `None` when generation is currently disabled.
    pub fn begin_generation(&mut self) -> Option<PendingTransform> {
        if !self.can_generate() {
            debug!("Generation ignored in state {}", self.state);
            return None;
        }
        let (image, style) = (self.uploaded.as_ref()?, self.selected_style.as_ref()?);

        let base64_image = match data_url::payload(&image.data_url) {
            Ok(payload) => payload.to_string(),
            Err(e) => {
                self.error = Some(e.to_string());
                return None;
            }
        };
        let request = TransformRequest {
            base64_image,
            mime_type: image.mime_type.clone(),
            prompt: style.prompt_text.clone(),
        };
        let progress = format!("Tailoring your {} headshot...", style.label);

        self.transition(WorkflowState::Generating).ok()?;
        self.error = None;
        self.progress = Some(progress);

        Some(PendingTransform {
            epoch: self.epoch,
            kind: TransformKind::Generation,
            request,
        })
    }

    /// Stores the prompt for the next edit. Only meaningful on the result view.
    pub fn set_edit_prompt(&mut self, prompt: impl Into<String>) -> Result<(), HeadshotError> {
        if self.state != WorkflowState::Result {
            return Err(HeadshotError::NotReady(format!(
                "Cannot edit while {}",
                self.state
            )));
        }
        self.edit_prompt = prompt.into();
        Ok(())
    }

    pub fn can_edit(&self) -> bool {
        self.state == WorkflowState::Result
            && self.result.is_some()
            && !self.edit_prompt.trim().is_empty()
    }

    /// Returns `None` when editing is currently disabled.
    pub fn begin_edit(&mut self) -> Option<PendingTransform> {
        if !self.can_edit() {
            debug!("Edit ignored in state {}", self.state);
            return None;
        }
        let result = self.result.as_ref()?;

        let base64_image = match data_url::payload(&result.data_url) {
            Ok(payload) => payload.to_string(),
            Err(e) => {
                self.error = Some(e.to_string());
                return None;
            }
        };
        // The result's own type, as detected when it was produced.
        let request = TransformRequest {
            base64_image,
            mime_type: result.mime_type.clone(),
            prompt: self.edit_prompt.clone(),
        };
        let progress = format!("Applying edits: \"{}\"...", self.edit_prompt);

        self.transition(WorkflowState::Editing).ok()?;
        self.error = None;
        self.progress = Some(progress);

        Some(PendingTransform {
            epoch: self.epoch,
            kind: TransformKind::Edit,
            request,
        })
    }

    /// Applies the outcome of a transform call. Returns `false` if the call
    /// was issued before a reset and has been discarded.
    pub fn complete(
        &mut self,
        pending: PendingTransform,
        outcome: Result<ResultImage, HeadshotError>,
    ) -> bool {
        if pending.epoch != self.epoch || self.state != pending.kind.busy_state() {
            info!("Discarding stale {:?} outcome", pending.kind);
            return false;
        }
        self.progress = None;

        let next = match (pending.kind, outcome) {
            (kind, Ok(image)) => {
                info!("{:?} produced a {} image", kind, image.mime_type);
                self.result = Some(image);
                self.error = None;
                if kind == TransformKind::Edit {
                    self.edit_prompt.clear();
                }
                WorkflowState::Result
            }
            (kind, Err(e)) => {
                warn!("{:?} failed: {}", kind, e);
                let message = e.to_string();
                self.error = Some(if message.trim().is_empty() {
                    kind.fallback_message().to_string()
                } else {
                    message
                });
                match kind {
                    TransformKind::Generation => WorkflowState::Idle,
                    TransformKind::Edit => WorkflowState::Result,
                }
            }
        };

        // Generating/Editing always have a way out, so this cannot fail.
        if let Err(e) = self.transition(next) {
            warn!("{}", e);
            self.state = next;
        }
        true
    }

    pub fn reset(&mut self) {
        debug!("Workflow {} -> {} (reset)", self.state, WorkflowState::Idle);
        self.epoch += 1;
        self.state = WorkflowState::Idle;
        self.uploaded = None;
        self.selected_style = None;
        self.result = None;
        self.edit_prompt.clear();
        self.error = None;
        self.progress = None;
    }

    pub fn snapshot(&self, session_id: Option<Uuid>) -> WorkflowSnapshot {
        WorkflowSnapshot {
            session_id,
            state: self.state,
            uploaded_image: self.uploaded.clone(),
            selected_style: self.selected_style.as_ref().map(|style| StyleSummary {
                id: style.id.clone(),
                label: style.label.clone(),
            }),
            result_image: self.result.clone(),
            edit_prompt: self.edit_prompt.clone(),
            error: self.error.clone(),
            progress_message: self.progress.clone(),
            can_generate: self.can_generate(),
            can_edit: self.can_edit(),
        }
    }
}

/// Awaits the call for `pending` and applies its outcome. The controller is
/// only locked to apply the outcome, never across the await. A call still
/// outstanding after `limit` is completed as a failure.
pub async fn run_transform(
    controller: SharedController,
    transformer: Arc<dyn ImageTransformer>,
    pending: PendingTransform,
    limit: Duration,
) -> bool {
    let outcome = match tokio::time::timeout(limit, transformer.transform(&pending.request)).await
    {
        Ok(outcome) => outcome,
        Err(_) => Err(HeadshotError::Transform(format!(
            "The image service did not answer within {:?}. Please try again.",
            limit
        ))),
    };
    controller.lock().complete(pending, outcome)
}
