use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::openrouter_types::{
    ChatMessage, ChatRequest, ChatResponse, ContentPart, ImageUrl, MessageContent,
};
use super::types::{VisionClient, VisionRequest};
use super::StructuringError;

/// Sent as `X-Title`; OpenRouter shows it on its usage dashboard.
const APP_TITLE: &str = "Medical Report Analyzer";
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f32 = 0.1;

/// OpenRouter (OpenAI-compatible chat completions) client.
pub struct OpenRouterClient {
    base_url: String,
    api_key: String,
    model: String,
    referer: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OpenRouterClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        referer: &str,
        timeout: Duration,
    ) -> Result<Self, StructuringError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StructuringError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            referer: referer.to_string(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn build_request<'a>(&'a self, request: &'a VisionRequest<'a>) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: MessageContent::Text(request.system_prompt),
                },
                ChatMessage {
                    role: "user",
                    content: MessageContent::Parts(vec![
                        ContentPart::Text {
                            text: request.user_prompt,
                        },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!(
                                    "data:{};base64,{}",
                                    request.mime_type, request.image_base64
                                ),
                            },
                        },
                    ]),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

impl VisionClient for OpenRouterClient {
    fn analyze_image(&self, request: &VisionRequest<'_>) -> Result<String, StructuringError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.build_request(request);
        let start = Instant::now();

        tracing::debug!(
            model = %self.model,
            image_b64_len = request.image_base64.len(),
            "Calling model service"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", APP_TITLE)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    StructuringError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    StructuringError::HttpClient(format!(
                        "Request timed out after {}s",
                        self.timeout_secs
                    ))
                } else {
                    StructuringError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Model service request failed");
            return Err(StructuringError::ServiceError {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| StructuringError::ResponseParsing(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Model usage"
            );
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(StructuringError::EmptyCompletion)?;

        tracing::info!(
            model = %self.model,
            completion_len = content.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model analysis complete"
        );
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Mock vision client for testing: returns a configurable response and
/// counts calls.
pub struct MockVisionClient {
    response: Result<String, String>,
    calls: AtomicUsize,
    last_user_prompt: Mutex<Option<String>>,
}

impl MockVisionClient {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    /// A client whose every call fails like an unreachable service.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            calls: AtomicUsize::new(0),
            last_user_prompt: Mutex::new(None),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.last_user_prompt.lock().ok().and_then(|p| p.clone())
    }
}

impl VisionClient for MockVisionClient {
    fn analyze_image(&self, request: &VisionRequest<'_>) -> Result<String, StructuringError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_user_prompt.lock() {
            *last = Some(request.user_prompt.to_string());
        }
        self.response
            .clone()
            .map_err(StructuringError::Connection)
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}
