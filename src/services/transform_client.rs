// src/services/transform_client.rs
use crate::data_url;
use crate::errors::HeadshotError;
use crate::models::{ResultImage, TransformRequest};
use crate::services::ImageInspector;
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose};
use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, Instant};

/// Turns (image, MIME type, instruction) into a new image.
///
/// One attempt per call. Implementations either return a complete, displayable
/// image or an error; never a partial result.
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    async fn transform(&self, request: &TransformRequest) -> Result<ResultImage, HeadshotError>;
}

pub struct GeminiTransformClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
    inspector: ImageInspector,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    candidates: Option<Vec<GeminiCandidate>>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    parts: Option<Vec<GeminiPart>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
    Text {
        text: String,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

impl GeminiTransformClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, HeadshotError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HeadshotError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            inspector: ImageInspector::new(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn build_payload(request: &TransformRequest) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {
                        "inlineData": {
                            "mimeType": request.mime_type,
                            "data": request.base64_image
                        }
                    },
                    { "text": request.prompt }
                ]
            }],
            "generationConfig": {
                "responseModalities": ["TEXT", "IMAGE"]
            }
        })
    }

    fn decode_image(&self, inline: GeminiInlineData) -> Result<ResultImage, HeadshotError> {
        let bytes = general_purpose::STANDARD.decode(inline.data.trim()).map_err(|e| {
            HeadshotError::Transform(format!("Image service returned undecodable data: {}", e))
        })?;

        let inspected = self.inspector.verify(&bytes).map_err(|e| {
            HeadshotError::Transform(format!("Image service returned an invalid image: {}", e))
        })?;

        if inspected.mime_type != inline.mime_type {
            debug!(
                "Service labelled image as {}, detected {}",
                inline.mime_type, inspected.mime_type
            );
        }

        Ok(ResultImage {
            data_url: data_url::encode(inspected.mime_type, &bytes),
            mime_type: inspected.mime_type.to_string(),
            generated_at: chrono::Utc::now(),
        })
    }
}

#[async_trait]
impl ImageTransformer for GeminiTransformClient {
    async fn transform(&self, request: &TransformRequest) -> Result<ResultImage, HeadshotError> {
        let start = Instant::now();
        info!(
            "Sending transform request (model={}, mime={}, payload={} chars)",
            self.model,
            request.mime_type,
            request.base64_image.len()
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::build_payload(request))
            .send()
            .await
            .map_err(|e| HeadshotError::Transform(format!("Image service request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Image service returned {}", status);
            return Err(HeadshotError::Transform(error_message(
                status.as_u16(),
                &error_text,
            )));
        }

        let result: GeminiResponse = response.json().await.map_err(|e| {
            HeadshotError::Transform(format!("Failed to parse image service response: {}", e))
        })?;

        let inline = extract_image(result)?;
        let image = self.decode_image(inline)?;

        info!(
            "Transform finished in {} ms ({})",
            start.elapsed().as_millis(),
            image.mime_type
        );
        Ok(image)
    }
}

/// Picks the first image part. Without one, the model's text (or the block
/// reason) explains why.
fn extract_image(response: GeminiResponse) -> Result<GeminiInlineData, HeadshotError> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(HeadshotError::Transform(format!(
            "The request was blocked by the image service ({})",
            reason
        )));
    }

    let mut texts = Vec::new();
    let mut finish_reason = None;

    for candidate in response.candidates.unwrap_or_default() {
        if finish_reason.is_none() {
            finish_reason = candidate.finish_reason;
        }
        let parts = candidate
            .content
            .and_then(|content| content.parts)
            .unwrap_or_default();
        for part in parts {
            match part {
                GeminiPart::InlineData { inline_data }
                    if inline_data.mime_type.starts_with("image/") =>
                {
                    return Ok(inline_data);
                }
                GeminiPart::Text { text } if !text.trim().is_empty() => {
                    texts.push(text.trim().to_string())
                }
                _ => {}
            }
        }
    }

    let message = if !texts.is_empty() {
        format!("No image was returned: {}", texts.join(" "))
    } else if let Some(reason) = finish_reason {
        format!("No image was returned (finish reason: {})", reason)
    } else {
        "No image was returned by the image service".to_string()
    };
    Err(HeadshotError::Transform(message))
}

fn error_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().chars().take(300).collect());

    if detail.is_empty() {
        format!("Image service error (status {})", status)
    } else {
        format!("Image service error (status {}): {}", status, detail)
    }
}
