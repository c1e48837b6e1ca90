// src/handlers.rs
use crate::services::image_inspector::extension_for_mime;
use crate::services::session_store::SharedController;
use crate::styles::EDIT_SUGGESTIONS;
use crate::workflow::{PendingTransform, UploadTicket, run_transform};
use crate::{AppState, data_url, errors::HeadshotError, models::*};
use actix_multipart::Multipart;
use actix_web::{Error, HttpResponse, http::header, rt, web};
use bytes::BytesMut;
use futures_util::TryStreamExt;
use uuid::Uuid;

pub async fn list_styles(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.catalog.presets())
}

pub async fn list_suggestions() -> HttpResponse {
    HttpResponse::Ok().json(EDIT_SUGGESTIONS)
}

pub async fn create_session(data: web::Data<AppState>) -> HttpResponse {
    let (session_id, controller) = data.sessions.create();
    let snapshot = controller.lock().snapshot(Some(session_id));
    HttpResponse::Created().json(snapshot)
}

pub async fn get_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let snapshot = controller.lock().snapshot(Some(session_id));
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn end_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    data.sessions.remove(&path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn upload_photo(
    path: web::Path<Uuid>,
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let mut field = payload
        .try_next()
        .await?
        .ok_or_else(|| HeadshotError::Validation("No file provided".to_string()))?;

    let filename = field
        .content_disposition()
        .get_filename()
        .map(|name| name.to_string());

    let content_type = field
        .content_type()
        .map(|ct| ct.to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let ticket = controller.lock().begin_upload(filename, &content_type)?;
    let upload = UploadInProgress::new(controller.clone(), ticket);

    // Collect image data
    let mut image_data = BytesMut::new();
    loop {
        let chunk = match field.try_next().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                let message = format!("Failed to read the uploaded file: {}", e);
                return Err(upload.abort(message).into());
            }
        };

        if image_data.len() + chunk.len() > data.max_upload_bytes {
            let message = format!(
                "Image is too large (limit is {} MB).",
                data.max_upload_bytes / (1024 * 1024)
            );
            return Err(upload.abort(message).into());
        }
        image_data.extend_from_slice(&chunk);
    }

    upload.finish(&image_data.freeze())?;
    let snapshot = controller.lock().snapshot(Some(session_id));
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Holds the upload ticket while the body is read. Dropping it unredeemed
/// (the request went away mid-read) puts the session back where it was.
struct UploadInProgress {
    controller: SharedController,
    ticket: Option<UploadTicket>,
}

impl UploadInProgress {
    fn new(controller: SharedController, ticket: UploadTicket) -> Self {
        Self {
            controller,
            ticket: Some(ticket),
        }
    }

    fn finish(mut self, bytes: &[u8]) -> Result<(), HeadshotError> {
        match self.ticket.take() {
            Some(ticket) => self.controller.lock().complete_upload(ticket, bytes),
            None => Err(HeadshotError::NotReady("Upload was superseded".to_string())),
        }
    }

    fn abort(mut self, message: String) -> HeadshotError {
        if let Some(ticket) = self.ticket.take() {
            self.controller.lock().abort_upload(ticket, message.clone());
        }
        HeadshotError::Validation(message)
    }
}

impl Drop for UploadInProgress {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.controller
                .lock()
                .abort_upload(ticket, "The upload was interrupted.".to_string());
        }
    }
}

pub async fn discard_photo(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let mut workflow = controller.lock();
    workflow.discard_upload()?;
    Ok(HttpResponse::Ok().json(workflow.snapshot(Some(session_id))))
}

pub async fn select_style(
    path: web::Path<Uuid>,
    body: web::Json<SelectStyleBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let mut workflow = controller.lock();
    workflow.select_style(&body.style_id)?;
    Ok(HttpResponse::Ok().json(workflow.snapshot(Some(session_id))))
}

pub async fn generate_headshot(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let pending = {
        let mut workflow = controller.lock();
        workflow.begin_generation().ok_or_else(|| {
            HeadshotError::NotReady(not_ready_message(
                workflow.state(),
                "Upload a photo and choose a style first",
            ))
        })?
    };

    finish_transform(controller, pending, &data, session_id).await
}

pub async fn set_edit_prompt(
    path: web::Path<Uuid>,
    body: web::Json<EditPromptBody>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let mut workflow = controller.lock();
    workflow.set_edit_prompt(body.into_inner().prompt)?;
    Ok(HttpResponse::Ok().json(workflow.snapshot(Some(session_id))))
}

pub async fn apply_edit(
    path: web::Path<Uuid>,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    // An empty body edits with the stored prompt.
    let prompt = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<ApplyEditBody>(&body)
            .map_err(|e| HeadshotError::Validation(format!("Invalid edit request: {}", e)))?
            .prompt
    };

    let pending = {
        let mut workflow = controller.lock();
        if let Some(prompt) = prompt {
            workflow.set_edit_prompt(prompt)?;
        }
        workflow.begin_edit().ok_or_else(|| {
            HeadshotError::NotReady(not_ready_message(
                workflow.state(),
                "Describe the edit you want first",
            ))
        })?
    };

    finish_transform(controller, pending, &data, session_id).await
}

/// The call runs as its own task, so the session leaves GENERATING/EDITING
/// even if this request is dropped before it resolves.
async fn finish_transform(
    controller: SharedController,
    pending: PendingTransform,
    data: &AppState,
    session_id: Uuid,
) -> Result<HttpResponse, Error> {
    rt::spawn(run_transform(
        controller.clone(),
        data.transformer.clone(),
        pending,
        data.transform_timeout,
    ))
    .await
    .map_err(|e| HeadshotError::Transform(e.to_string()))?;

    let snapshot = controller.lock().snapshot(Some(session_id));
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn reset_session(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let mut workflow = controller.lock();
    workflow.reset();
    Ok(HttpResponse::Ok().json(workflow.snapshot(Some(session_id))))
}

pub async fn download_result(
    path: web::Path<Uuid>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = path.into_inner();
    let controller = data.sessions.get(&session_id)?;

    let result_url = controller
        .lock()
        .result_image()
        .map(|image| image.data_url.clone())
        .ok_or_else(|| HeadshotError::NotFound("No headshot has been generated yet".to_string()))?;

    let (mime_type, bytes) = data_url::decode(&result_url)?;
    let filename = format!("headshot.{}", extension_for_mime(&mime_type));

    Ok(HttpResponse::Ok()
        .content_type(mime_type)
        .insert_header((
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ))
        .body(bytes))
}

fn not_ready_message(state: WorkflowState, otherwise: &str) -> String {
    if state.is_busy() {
        "A headshot is already being processed".to_string()
    } else {
        otherwise.to_string()
    }
}
