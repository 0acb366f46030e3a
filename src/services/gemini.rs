use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use image::DynamicImage;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::models::classification::ClassificationResult;
use crate::services::classifier::{
    prepare_upload, Classifier, ClassifyError, CLASSIFY_PROMPT, UPLOAD_MIME_TYPE,
};

/// Client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 2],
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl GeminiClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, ClassifyError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send prompt + JPEG bytes and return the reply text.
    pub async fn generate(&self, jpeg: &[u8]) -> Result<String, ClassifyError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [
                    RequestPart::Text {
                        text: CLASSIFY_PROMPT,
                    },
                    RequestPart::Inline {
                        inline_data: InlineData {
                            mime_type: UPLOAD_MIME_TYPE,
                            data: base64::engine::general_purpose::STANDARD.encode(jpeg),
                        },
                    },
                ],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            return Err(ClassifyError::Api {
                status: status.as_u16(),
                message: api_error_message(&raw),
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        reply_text(parsed)
    }
}

#[async_trait]
impl Classifier for GeminiClient {
    async fn classify(&self, image: &DynamicImage) -> Result<ClassificationResult, ClassifyError> {
        let jpeg = prepare_upload(image)?;
        tracing::debug!(model = %self.model, bytes = jpeg.len(), "Sending image to Gemini");

        let text = self.generate(&jpeg).await?;
        Ok(ClassificationResult::from_reply(text))
    }
}

fn reply_text(response: GenerateResponse) -> Result<String, ClassifyError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ClassifyError::EmptyResponse);
    }
    Ok(text)
}

fn api_error_message(raw: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(raw) {
        Ok(envelope) => envelope.error.message,
        Err(_) if raw.is_empty() => "no response body".to_string(),
        Err(_) => raw.chars().take(200).collect(),
    }
}
