//! Google Gemini provider
//!
//! Talks to the `generateContent` REST endpoint. The API key comes from the
//! environment variable named in `gemini.api_key_env`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::core::{Config, ConductorError, Message, Result, Role};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

pub struct GeminiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    candidate_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_sequences: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

impl GeminiProvider {
    /// Build the provider; fails when the API key is missing
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.gemini_api_key()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.gemini.timeout_secs))
            .build()
            .map_err(|e| ConductorError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.gemini.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.replace("google/", ""),
        })
    }

    /// System messages go to `systemInstruction`; the rest keep their order.
    fn build_request(messages: &[Message], options: Option<GenerateOptions>) -> GenerateRequest {
        let system_text: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let contents = messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(if m.role == Role::Human { "user" } else { "model" }.to_string()),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let options = options.unwrap_or_default();

        GenerateRequest {
            contents,
            system_instruction: (!system_text.is_empty()).then(|| Content {
                role: None,
                parts: vec![Part {
                    text: system_text.join("\n\n"),
                }],
            }),
            generation_config: GenerationConfig {
                candidate_count: 1,
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                stop_sequences: options.stop,
            },
        }
    }

    fn to_llm_response(&self, response: GenerateResponse) -> Result<LLMResponse> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| ConductorError::llm("Gemini returned no candidates"))?;

        let content = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(LLMResponse {
            content,
            usage: response
                .usage_metadata
                .map(|u| TokenUsage::new(u.prompt_token_count, u.candidates_token_count)),
            model: self.model.clone(),
        })
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn invoke(
        &self,
        messages: &[Message],
        options: Option<GenerateOptions>,
    ) -> Result<LLMResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::build_request(messages, options);

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            if status.as_u16() == 404 {
                return Err(ConductorError::ModelNotFound(self.model.clone()));
            }
            return Err(ConductorError::llm(format!(
                "Gemini API error ({}): {}",
                status, error_text
            )));
        }

        let response: GenerateResponse = resp
            .json()
            .await
            .map_err(|e| ConductorError::llm(format!("Failed to parse response: {}", e)))?;

        self.to_llm_response(response)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
