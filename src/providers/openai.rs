use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestMessage, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use serde::Deserialize;
use crate::error::ProviderError;
use crate::providers::{PlateRecognizer, VisionClassifier};
use crate::types::Classification;

pub const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";

const NOT_A_CAR: &str = "not a car";
const NOT_REACHABLE: &str = "image not reachable";
const NO_PLATE: &str = "NONE";

/// Vision model behind the OpenAI chat-completions API.
///
/// One instance serves as both the classifier and the plate recognizer.
pub struct OpenAiVision {
    client:       Client<OpenAIConfig>,
    http:         reqwest::Client,
    model:        String,
    probe_images: bool,
}

impl OpenAiVision {
    /// Standard OpenAI client using OPENAI_API_KEY env var
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_client(Client::new(), model)
    }

    pub fn with_api_key(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self::with_client(Client::with_config(config), model)
    }

    /// Custom base URL for OpenAI-compatible vision endpoints.
    pub fn with_base_url(
        api_base: impl Into<String>,
        api_key:  impl Into<String>,
        model:    impl Into<String>,
    ) -> Self {
        let config = OpenAIConfig::new()
            .with_api_base(api_base)
            .with_api_key(api_key);
        Self::with_client(Client::with_config(config), model)
    }

    fn with_client(client: Client<OpenAIConfig>, model: impl Into<String>) -> Self {
        Self {
            client,
            http:         reqwest::Client::new(),
            model:        model.into(),
            probe_images: true,
        }
    }

    /// Skip the HEAD probe and hand every URL straight to the model.
    pub fn without_probe(mut self) -> Self {
        self.probe_images = false;
        self
    }

    /// True when a HEAD request for the image answers 200.
    async fn reachable(&self, image_url: &str) -> bool {
        match self.http.head(image_url).send().await {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => true,
            Ok(resp) => {
                tracing::info!(image_url, status = resp.status().as_u16(), "image not reachable");
                false
            }
            Err(e) => {
                tracing::info!(image_url, error = %e, "image probe failed");
                false
            }
        }
    }

    /// Sends one user turn made of `prompt` plus the image and returns the
    /// model's text reply.
    async fn ask(&self, prompt: &str, image_url: &str) -> Result<String, ProviderError> {
        let messages: Vec<ChatCompletionRequestMessage> = serde_json::from_value(serde_json::json!([{
            "role": "user",
            "content": [
                { "type": "text", "text": prompt },
                { "type": "image_url", "image_url": { "url": image_url, "detail": "auto" } }
            ]
        }]))
        .map_err(|e| ProviderError::Malformed(format!("Failed to build messages: {}", e)))?;

        let mut request_builder = CreateChatCompletionRequestArgs::default();
        request_builder.model(self.model.as_str()).messages(messages);

        let request = request_builder.build()
            .map_err(|e| ProviderError::Malformed(format!("Failed to build request: {}", e)))?;

        let response = self.client.chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let choice = response.choices.into_iter().next()
            .ok_or_else(|| ProviderError::Malformed("Empty response from OpenAI".to_string()))?;

        choice.message.content
            .ok_or_else(|| ProviderError::Malformed("No content in OpenAI response".to_string()))
    }
}

fn map_openai_error(e: OpenAIError) -> ProviderError {
    match e {
        OpenAIError::Reqwest(e) => ProviderError::Http(e.to_string()),
        OpenAIError::JSONDeserialize(e) => ProviderError::Malformed(e.to_string()),
        other => ProviderError::Unavailable(format!("OpenAI API error: {}", other)),
    }
}

fn classification_prompt(car_type: &str) -> String {
    format!(
        "Analyze this image and determine if it shows the specific car type: '{car_type}'. \
         Consider the make, model, and any other distinguishing features. \
         Respond with ONLY valid JSON, no markdown or extra text. \
         Use this exact schema: {{\"is_car\": true/false, \"car_type\": string}}. \
         \"is_car\" should be true only if the image shows a {car_type} (or a very close match). \
         The car should not be a toy, it should be a real car. \
         If it is not a car, or if it's a different car type, set is_car to false. \
         If it matches, return the detected car type in the car_type field."
    )
}

fn plate_prompt() -> String {
    format!(
        "Read the vehicle license plate visible in this image. \
         Respond with ONLY the plate characters exactly as shown, no other text. \
         If no license plate is readable, respond with {}.",
        NO_PLATE
    )
}

/// Returns the body of a ```json fenced block, or the trimmed input when
/// there is no fence.
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after = &trimmed[start + 3..];
    let after = after.strip_prefix("json").unwrap_or(after);
    match after.find("```") {
        Some(end) => after[..end].trim(),
        None      => after.trim(),
    }
}

#[derive(Deserialize)]
struct Verdict {
    #[serde(default)]
    is_car:   bool,
    car_type: Option<String>,
}

fn parse_classification(content: &str) -> Classification {
    match serde_json::from_str::<Verdict>(strip_code_fence(content)) {
        Ok(v) => Classification {
            is_match:       v.is_car,
            detected_label: v.car_type
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| NOT_A_CAR.to_string()),
        },
        Err(e) => {
            tracing::warn!(error = %e, "unparseable classification reply");
            Classification::miss(NOT_A_CAR)
        }
    }
}

fn parse_plate(content: &str) -> String {
    let reply = strip_code_fence(content).trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
    if reply.eq_ignore_ascii_case(NO_PLATE) || reply.chars().count() > 12 {
        return String::new();
    }
    reply.to_string()
}

#[async_trait]
impl VisionClassifier for OpenAiVision {
    async fn classify(&self, image_url: &str, expected_description: &str) -> Result<Classification, ProviderError> {
        if self.probe_images && !self.reachable(image_url).await {
            return Ok(Classification::miss(NOT_REACHABLE));
        }
        let reply = self.ask(&classification_prompt(expected_description), image_url).await?;
        Ok(parse_classification(&reply))
    }
}

#[async_trait]
impl PlateRecognizer for OpenAiVision {
    async fn extract(&self, image_url: &str) -> Result<String, ProviderError> {
        let reply = self.ask(&plate_prompt(), image_url).await?;
        Ok(parse_plate(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fenced_json() {
        let reply = "```json\n{\"is_car\": true, \"car_type\": \"Porsche 718 Cayman\"}\n```";
        assert_eq!(parse_classification(reply), Classification::matched("Porsche 718 Cayman"));
    }

    #[test]
    fn parses_bare_json() {
        let reply = "{\"is_car\": false, \"car_type\": \"Volkswagen Golf\"}";
        assert_eq!(parse_classification(reply), Classification::miss("Volkswagen Golf"));
    }

    #[test]
    fn garbage_is_a_miss() {
        assert_eq!(parse_classification("I think it is a car."), Classification::miss("not a car"));
        assert_eq!(parse_classification("{\"is_car\": true, \"car_type\": null}"), Classification::matched("not a car"));
    }

    #[test]
    fn plate_replies() {
        assert_eq!(parse_plate("AB-123-C"), "AB-123-C");
        assert_eq!(parse_plate(" \"AB-123-C\" "), "AB-123-C");
        assert_eq!(parse_plate("NONE"), "");
        assert_eq!(parse_plate("There is no readable license plate in this image."), "");
    }

    #[test]
    fn prompt_names_the_car() {
        assert!(classification_prompt("Nissan 350Z Roadster").contains("'Nissan 350Z Roadster'"));
    }
}
