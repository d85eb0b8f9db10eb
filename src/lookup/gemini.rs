//! Gemini `generateContent` adapter with Google Search grounding.
//!
//! Uses a blocking `ureq` agent: the enrichment loop is sequential, so each
//! lookup simply blocks until the service answers or the timeout fires.
use super::{
    build_lookup_prompt, parse_possibly_wrapped_json, LookupClient, LookupFailure, LookupResult,
};
use crate::util::truncate_string;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Upper bound on error-body text carried into failure messages.
const ERROR_BODY_LIMIT: usize = 500;

/// Connection settings, built once from the resolved config.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    /// API root, e.g. `https://generativelanguage.googleapis.com/v1beta`.
    pub endpoint: String,
    pub temperature: f32,
    pub timeout: Duration,
}

pub struct GeminiClient {
    agent: ureq::Agent,
    settings: GeminiSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

/// One entry from the model catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    pub fn supports_generate_content(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|method| method == "generateContent")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelPage {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(settings.timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            settings,
        }
    }

    fn endpoint(&self) -> &str {
        self.settings.endpoint.trim_end_matches('/')
    }

    /// Send one prompt and return the concatenated candidate text.
    fn generate(&self, prompt: &str) -> Result<String, LookupFailure> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.endpoint(),
            self.settings.model
        );
        let body = build_request(prompt, self.settings.temperature);

        let mut response = self
            .agent
            .post(&url)
            .header("x-goog-api-key", self.settings.api_key.as_str())
            .send_json(&body)
            .map_err(|err| LookupFailure::Remote(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.body_mut().read_to_string().unwrap_or_default();
            return Err(LookupFailure::Remote(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate_string(detail.trim(), ERROR_BODY_LIMIT)
            )));
        }

        let parsed: GenerateResponse = response
            .body_mut()
            .read_json()
            .map_err(|err| LookupFailure::Remote(format!("decode response: {err}")))?;
        Ok(response_text(&parsed))
    }

    /// List models that accept `generateContent` requests.
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = format!("{}/models", self.endpoint());
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .agent
                .get(&url)
                .header("x-goog-api-key", self.settings.api_key.as_str())
                .query("pageSize", "1000");
            if let Some(token) = &page_token {
                request = request.query("pageToken", token);
            }

            let mut response = request.call().context("request model list")?;
            let status = response.status();
            if !status.is_success() {
                let detail = response.body_mut().read_to_string().unwrap_or_default();
                return Err(anyhow!(
                    "model list failed with HTTP {}: {}",
                    status.as_u16(),
                    truncate_string(detail.trim(), ERROR_BODY_LIMIT)
                ));
            }
            let page: ModelPage = response
                .body_mut()
                .read_json()
                .context("parse model list JSON")?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(ModelInfo::supports_generate_content),
            );
            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(models)
    }
}

impl LookupClient for GeminiClient {
    fn lookup(&self, name: &str, description: &str) -> Result<LookupResult, LookupFailure> {
        let prompt = build_lookup_prompt(name, description);
        let start = Instant::now();
        let text = self.generate(&prompt)?;

        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            model = %self.settings.model,
            prompt_bytes = prompt.len(),
            response_bytes = text.len(),
            "lookup complete"
        );

        if text.trim().is_empty() {
            return Err(LookupFailure::EmptyResponse);
        }
        parse_possibly_wrapped_json(&text).map_err(LookupFailure::from)
    }
}

fn build_request(prompt: &str, temperature: f32) -> GenerateRequest<'_> {
    GenerateRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: prompt }],
        }],
        tools: vec![Tool {
            google_search: GoogleSearch {},
        }],
        generation_config: GenerationConfig { temperature },
    }
}

fn response_text(response: &GenerateResponse) -> String {
    response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_enables_search_grounding_and_temperature() {
        let body = serde_json::to_value(build_request("find acme", 0.1)).expect("serialize");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "find acme");
        assert_eq!(body["tools"][0], json!({"google_search": {}}));
        let temperature = body["generationConfig"]["temperature"]
            .as_f64()
            .expect("temperature");
        assert!((temperature - 0.1).abs() < 1e-6);
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let raw = json!({
            "candidates": [
                {"content": {"role": "model", "parts": [
                    {"text": "```json\n{\"website\": "},
                    {"text": "\"https://acme.com\"}\n```"}
                ]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 10}
        });
        let parsed: GenerateResponse = serde_json::from_value(raw).expect("decode");
        let text = response_text(&parsed);
        assert_eq!(text, "```json\n{\"website\": \"https://acme.com\"}\n```");
        let result = parse_possibly_wrapped_json(&text).expect("links");
        assert_eq!(result.website.as_deref(), Some("https://acme.com"));
    }

    #[test]
    fn response_text_is_empty_without_candidates() {
        let blocked: GenerateResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
                .expect("decode");
        assert_eq!(response_text(&blocked), "");
        let no_parts: GenerateResponse =
            serde_json::from_value(json!({"candidates": [{"finishReason": "STOP"}]}))
                .expect("decode");
        assert_eq!(response_text(&no_parts), "");
    }

    #[test]
    fn model_filter_keeps_generate_content_models() {
        let page: ModelPage = serde_json::from_value(json!({
            "models": [
                {"name": "models/gemini-2.5-flash", "displayName": "Gemini 2.5 Flash",
                 "supportedGenerationMethods": ["generateContent", "countTokens"]},
                {"name": "models/text-embedding-004",
                 "supportedGenerationMethods": ["embedContent"]}
            ]
        }))
        .expect("decode");
        let names: Vec<&str> = page
            .models
            .iter()
            .filter(|model| model.supports_generate_content())
            .map(|model| model.name.as_str())
            .collect();
        assert_eq!(names, ["models/gemini-2.5-flash"]);
        assert_eq!(page.next_page_token, None);
    }

    #[test]
    fn unreachable_endpoint_is_a_remote_failure() {
        let client = GeminiClient::new(GeminiSettings {
            api_key: "test-key".to_string(),
            model: "gemini-2.5-flash".to_string(),
            endpoint: "http://127.0.0.1:9".to_string(),
            temperature: 0.1,
            timeout: Duration::from_secs(5),
        });
        let err = client.lookup("Acme Corp", "widgets").unwrap_err();
        assert!(matches!(err, LookupFailure::Remote(_)), "got {err}");
    }
}
