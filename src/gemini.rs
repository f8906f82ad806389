use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::{
    config::{AppConfig, DEMO_KEY},
    error::PatternError,
    models::{ChatMessage, ChatRole, GenerationRequest, Pattern},
    source::PatternSource,
    template::{craft_phrase, difficulty_label, item_name, TemplateEngine},
};

const TEXT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("HTTP error: {0}")] Http(String),
    #[error("Other: {0}")] Other(String),
}

impl From<GeminiError> for PatternError {
    fn from(e: GeminiError) -> Self {
        PatternError::GenerationUnavailable(e.to_string())
    }
}

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// Every request is bounded by `timeout`, connect and response included.
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GeminiError::Other(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, api_key, base_url })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, GeminiError> {
        Self::new(cfg.gemini_api_key.clone(), cfg.gemini_api_base.clone(), cfg.gemini_timeout)
    }

    pub fn is_demo(&self) -> bool {
        self.api_key.trim().is_empty() || self.api_key == DEMO_KEY
    }

    async fn perform_api_call(&self, payload: serde_json::Value) -> Result<String, GeminiError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, TEXT_MODEL);
        info!("🔗 Making request to: {}", url);

        let response = self.client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&payload)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        let response_text = response.text().await.map_err(|e| GeminiError::Http(e.to_string()))?;
        info!("📥 Response status: {}", status);

        if !status.is_success() {
            error!("❌ Gemini API error {}: {}", status, response_text);
            return Err(GeminiError::Http(format!("status={} body={}", status, response_text)));
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| GeminiError::Other(format!("parse error: {}", e)))?;
        extract_first_text(&parsed).ok_or_else(|| GeminiError::Other("no text content in response".into()))
    }

    pub async fn generate_pattern(&self, request: &GenerationRequest) -> Result<Pattern, GeminiError> {
        let prompt = build_pattern_prompt(request);
        info!("🎯 Asking Gemini for a pattern, prompt (truncated): {}", prompt.chars().take(120).collect::<String>());

        let payload = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.4,
                "topP": 0.95,
                "topK": 40,
                "candidateCount": 1
            }
        });
        let text = self.perform_api_call(payload).await?;
        parse_pattern(&text)
    }

    pub async fn chat(&self, system: &str, history: &[ChatMessage], message: &str) -> Result<String, GeminiError> {
        let mut contents: Vec<serde_json::Value> = history
            .iter()
            .map(|m| {
                let role = match m.role {
                    ChatRole::User => "user",
                    ChatRole::Model => "model",
                };
                json!({ "role": role, "parts": [{ "text": m.text }] })
            })
            .collect();
        contents.push(json!({ "role": "user", "parts": [{ "text": message }] }));

        let payload = json!({
            "systemInstruction": { "parts": [{ "text": system }] },
            "contents": contents,
            "generationConfig": { "temperature": 0.7, "topK": 40, "topP": 0.95, "maxOutputTokens": 450 }
        });
        self.perform_api_call(payload).await.map(|t| t.trim().to_string())
    }
}

pub fn build_pattern_prompt(request: &GenerationRequest) -> String {
    let yarn = request.yarn().map(|y| format!(" The yarn is {y}.")).unwrap_or_default();
    let notes = request.notes().map(|n| format!(" Special request: {n}.")).unwrap_or_default();
    format!(
        "Write a {} {} pattern for a {} using {}.{yarn}{notes} \
        Respond with JSON only, shaped as {{\"title\", \"description\", \"difficulty\", \"timeEstimate\", \
        \"materials\": [string], \"tools\": [string], \"abbreviations\": [{{\"term\", \"explanation\"}}], \
        \"steps\": [{{\"phase\", \"instructions\": [string]}}], \"tips\": [string]}}. \
        Use exactly three steps named \"Setup\", \"Body\" and \"Finishing\", in that order.",
        difficulty_label(request.difficulty).to_lowercase(),
        request.craft,
        item_name(request.item),
        craft_phrase(request.craft),
    )
}

/// Parses model output into a pattern, tolerating a surrounding markdown fence.
pub fn parse_pattern(text: &str) -> Result<Pattern, GeminiError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed);
    let pattern: Pattern = serde_json::from_str(body.trim())
        .map_err(|e| GeminiError::Other(format!("pattern JSON did not parse: {}", e)))?;
    pattern.check_invariants().map_err(|e| GeminiError::Other(e.to_string()))?;
    Ok(pattern)
}

/// AI-backed source. Falls back to the template engine so a caller always gets a pattern.
pub struct GeminiSource {
    client: GeminiClient,
    fallback: TemplateEngine,
}

impl GeminiSource {
    pub fn new(client: GeminiClient, fallback: TemplateEngine) -> Self {
        Self { client, fallback }
    }
}

#[async_trait]
impl PatternSource for GeminiSource {
    fn name(&self) -> &'static str { "gemini" }

    async fn generate(&self, request: &GenerationRequest) -> Result<Pattern, PatternError> {
        if self.client.is_demo() {
            info!("Using demo mode - template pattern instead of Gemini");
            return Ok(self.fallback.generate(request));
        }
        match self.client.generate_pattern(request).await {
            Ok(pattern) => {
                info!("✅ Gemini pattern '{}' with {} phases", pattern.title, pattern.steps.len());
                Ok(pattern)
            }
            Err(e) => {
                let e = PatternError::from(e);
                error!("❌ {}", e);
                info!("🔄 Falling back to template pattern");
                Ok(self.fallback.generate(request))
            }
        }
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde_json::Value),
}

fn extract_first_text(resp: &GeminiResponse) -> Option<String> {
    resp.candidates
        .iter()
        .flat_map(|c| c.content.parts.iter())
        .find_map(|p| match p {
            Part::Text { text } => Some(text.clone()),
            Part::Other(_) => None,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Craft, Difficulty, Item};
    use pretty_assertions::assert_eq;

    fn engine_json() -> String {
        let pattern = TemplateEngine::default().generate(&GenerationRequest::new(Item::Beanie, Craft::Knitting, Difficulty::Beginner));
        serde_json::to_string(&pattern).unwrap()
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let raw = engine_json();
        let plain = parse_pattern(&raw).unwrap();
        let fenced = parse_pattern(&format!("```json\n{raw}\n```")).unwrap();
        assert_eq!(plain, fenced);
        assert_eq!(plain.steps.len(), 3);
    }

    #[test]
    fn rejects_patterns_that_break_the_invariants() {
        let mut value: serde_json::Value = serde_json::from_str(&engine_json()).unwrap();
        value["steps"].as_array_mut().unwrap().pop();
        assert!(parse_pattern(&value.to_string()).is_err());
        assert!(parse_pattern("not json at all").is_err());
    }

    #[test]
    fn extracts_text_part_from_response() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "inlineData": { "data": "x" } }, { "text": "hello" }] } }]
        }))
        .unwrap();
        assert_eq!(extract_first_text(&resp).as_deref(), Some("hello"));
    }

    #[test]
    fn prompt_mentions_choices_and_notes() {
        let req = GenerationRequest::new(Item::Basket, Craft::Crochet, Difficulty::Advanced)
            .with_yarn("cotton")
            .with_notes("extra sturdy");
        let prompt = build_pattern_prompt(&req);
        assert!(prompt.contains("storage basket"));
        assert!(prompt.contains("single-hook crochet"));
        assert!(prompt.contains("cotton"));
        assert!(prompt.contains("extra sturdy"));
    }

    fn client(key: &str, base_url: &str, timeout: Duration) -> GeminiClient {
        GeminiClient::new(key.into(), base_url.into(), timeout).unwrap()
    }

    #[tokio::test]
    async fn demo_key_uses_the_template_engine() {
        let source = GeminiSource::new(client(DEMO_KEY, "http://127.0.0.1:9", Duration::from_secs(5)), TemplateEngine::default());
        let req = GenerationRequest::new(Item::Scarf, Craft::Knitting, Difficulty::Beginner);
        let pattern = source.generate(&req).await.unwrap();
        assert_eq!(pattern, TemplateEngine::default().generate(&req));
    }

    #[tokio::test]
    async fn unreachable_api_falls_back_to_template() {
        let source = GeminiSource::new(client("real-key", "http://127.0.0.1:9", Duration::from_secs(5)), TemplateEngine::default());
        let req = GenerationRequest::new(Item::Kippah, Craft::Crochet, Difficulty::Intermediate);
        let pattern = source.generate(&req).await.unwrap();
        assert_eq!(pattern, TemplateEngine::default().generate(&req));
    }

    #[tokio::test]
    async fn silent_server_times_out_into_template() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections without ever writing a response.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let source = GeminiSource::new(
            client("real-key", &format!("http://{addr}"), Duration::from_millis(200)),
            TemplateEngine::default(),
        );
        let req = GenerationRequest::new(Item::Vest, Craft::Knitting, Difficulty::Advanced);
        let pattern = tokio::time::timeout(Duration::from_secs(5), source.generate(&req))
            .await
            .expect("generate should finish once the client timeout fires")
            .unwrap();
        assert_eq!(pattern, TemplateEngine::default().generate(&req));
        server.abort();
    }

    #[test]
    fn blank_key_counts_as_demo() {
        assert!(client("", "http://127.0.0.1:9", Duration::from_secs(1)).is_demo());
        assert!(client("  ", "http://127.0.0.1:9", Duration::from_secs(1)).is_demo());
        assert!(!client("real-key", "http://127.0.0.1:9", Duration::from_secs(1)).is_demo());
    }
}
