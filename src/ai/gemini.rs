//! Google Gemini over its REST `generateContent` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{log_info, log_warn};

use super::{
    image::prepare_image,
    parse::{parse_food_analysis, parse_routines},
    prompts::{self, COACH_INSTRUCTION, FOOD_PHOTO_PROMPT},
    AiError, AiService, ChatRole, ChatTurn, FoodAnalysis, GeneratedRoutine,
};

const ENABLE_LOGS: bool = true;

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum ContentPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

impl GenerationConfig {
    fn json() -> Self {
        Self {
            temperature: Some(0.4),
            response_mime_type: Some("application/json"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

fn text_content(role: Option<&str>, text: impl Into<String>) -> GeminiContent {
    GeminiContent {
        role: role.map(str::to_owned),
        parts: vec![ContentPart::Text { text: text.into() }],
    }
}

pub struct GeminiService {
    api_key: String,
    model: String,
    client: Client,
    base_url: String,
}

impl GeminiService {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            client: Client::new(),
            base_url: API_BASE_URL.to_owned(),
        }
    }

    /// Points the client somewhere other than Google, e.g. a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_url(&self, method: &str) -> String {
        format!(
            "{}/models/{}:{method}?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    async fn generate(&self, request: &GeminiRequest) -> Result<String, AiError> {
        if self.api_key.is_empty() {
            return Err(AiError::MissingApiKey);
        }

        let response = self
            .client
            .post(self.build_url("generateContent"))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            log_warn!("Gemini returned {status}");
            return Err(Self::map_api_error(status.as_u16(), &body));
        }

        let parsed: GeminiResponse = serde_json::from_str(&body).map_err(|e| AiError::Api {
            status: status.as_u16(),
            message: format!("unreadable response: {e}"),
        })?;

        if let Some(error) = parsed.error {
            return Err(AiError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }

        Self::extract_text(parsed).ok_or(AiError::Api {
            status: status.as_u16(),
            message: "response had no text".to_owned(),
        })
    }

    fn extract_text(response: GeminiResponse) -> Option<String> {
        let parts = response
            .candidates?
            .into_iter()
            .next()?
            .content?
            .parts;
        let text: String = parts
            .into_iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text),
                ContentPart::InlineData { .. } => None,
            })
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }

    fn map_api_error(status: u16, body: &str) -> AiError {
        let message = serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.to_owned(), |e| e.message);

        match status {
            429 => AiError::RateLimited(Self::quota_message(&message)),
            _ => AiError::Api { status, message },
        }
    }

    /// Turns "... Please retry in 6.4s." into a whole-second hint.
    fn quota_message(message: &str) -> String {
        const MARKER: &str = "Please retry in ";
        let seconds = message
            .find(MARKER)
            .map(|pos| &message[pos + MARKER.len()..])
            .and_then(|rest| rest.split_once('s'))
            .and_then(|(value, _)| value.parse::<f64>().ok());

        match seconds {
            Some(seconds) => format!(
                "AI service is busy. Please try again in {} seconds.",
                seconds.ceil() as u64
            ),
            None => "AI service is busy. Please wait a moment and try again.".to_owned(),
        }
    }
}

#[async_trait]
impl AiService for GeminiService {
    async fn generate_routines(&self, prompt: &str) -> Result<Vec<GeneratedRoutine>, AiError> {
        let request = GeminiRequest {
            contents: vec![text_content(Some("user"), prompts::routine_prompt(prompt))],
            system_instruction: None,
            generation_config: Some(GenerationConfig::json()),
        };
        let text = self.generate(&request).await?;
        let routines = parse_routines(&text)?;
        log_info!("Generated {} routine(s)", routines.len());
        Ok(routines)
    }

    async fn chat(&self, message: &str, history: &[ChatTurn]) -> Result<String, AiError> {
        let mut contents: Vec<GeminiContent> = prompts::trim_history(history)
            .iter()
            .map(|turn| {
                let role = match turn.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                };
                text_content(Some(role), turn.text.clone())
            })
            .collect();
        contents.push(text_content(Some("user"), message));

        let request = GeminiRequest {
            contents,
            system_instruction: Some(text_content(None, COACH_INSTRUCTION)),
            generation_config: None,
        };
        let reply = self.generate(&request).await?;
        Ok(reply.trim().to_owned())
    }

    async fn analyze_food_image(&self, image: &[u8]) -> Result<FoodAnalysis, AiError> {
        let prepared = prepare_image(image)?;
        log_info!(
            "Uploading food photo {}x{} ({} base64 bytes)",
            prepared.width,
            prepared.height,
            prepared.base64.len()
        );

        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_owned()),
                parts: vec![
                    ContentPart::InlineData {
                        inline_data: InlineData {
                            mime_type: prepared.mime_type.to_owned(),
                            data: prepared.base64,
                        },
                    },
                    ContentPart::Text {
                        text: FOOD_PHOTO_PROMPT.to_owned(),
                    },
                ],
            }],
            system_instruction: None,
            generation_config: Some(GenerationConfig::json()),
        };
        let text = self.generate(&request).await?;
        Ok(parse_food_analysis(&text)?)
    }
}
