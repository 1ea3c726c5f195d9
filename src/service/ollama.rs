//! Ollama chat client
//!
//! `POST {base_url}/api/chat` with `stream: false`. The model is told to
//! reply with a bare `true` or `false`.

use super::{ServiceFailure, VerdictRequest, VerdictService};
use crate::config::ServiceConfig;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const SYSTEM_PROMPT: &str = "You are a highly logical and precise data comparison tool. \
Your only function is to determine if two values match based on a strict set of rules. \
You will only respond with the exact word 'true' or 'false'.";

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ReplyMessage,
}

#[derive(Clone)]
pub struct OllamaService {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
    top_p: f32,
}

impl OllamaService {
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

/// User prompt carrying both values and the rule.
pub fn user_prompt(request: &VerdictRequest) -> String {
    format!(
        "Search value: {}\nRow {}: {}\n\nRules:\n- {}\n- Only reply with 'true' or 'false'.\n",
        request.search, request.field, request.candidate, request.rule
    )
}

/// A reply containing "true" anywhere is an accept.
pub fn parse_verdict(content: &str) -> bool {
    content.to_lowercase().contains("true")
}

fn classify_status(status: StatusCode) -> Option<ServiceFailure> {
    if status.is_success() {
        None
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Some(ServiceFailure::Transient(format!("HTTP {}", status)))
    } else {
        Some(ServiceFailure::Fatal(format!("HTTP {}", status)))
    }
}

fn classify_error(error: reqwest::Error) -> ServiceFailure {
    if error.is_timeout() || error.is_connect() || error.is_request() {
        ServiceFailure::Transient(error.to_string())
    } else {
        ServiceFailure::Fatal(error.to_string())
    }
}

#[async_trait]
impl VerdictService for OllamaService {
    fn model(&self) -> &str {
        &self.model
    }

    async fn decide(&self, request: &VerdictRequest) -> Result<bool, ServiceFailure> {
        let prompt = user_prompt(request);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                top_p: self.top_p,
            },
        };

        let response = self
            .client
            .post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(classify_error)?;

        if let Some(failure) = classify_status(response.status()) {
            return Err(failure);
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceFailure::Fatal(format!("unexpected reply: {}", e)))?;

        Ok(parse_verdict(&reply.message.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatchField;

    #[test]
    fn test_parse_verdict() {
        assert!(parse_verdict("true"));
        assert!(parse_verdict(" True.\n"));
        assert!(!parse_verdict("false"));
        assert!(!parse_verdict(""));
    }

    #[test]
    fn test_user_prompt_carries_values_and_rule() {
        let request = VerdictRequest {
            field: MatchField::Manufacturer,
            rule: "Ignore differences in case.".into(),
            search: "acme".into(),
            candidate: "acme co".into(),
        };
        let prompt = user_prompt(&request);
        assert!(prompt.contains("Search value: acme\n"));
        assert!(prompt.contains("Row manufacturer: acme co"));
        assert!(prompt.contains("- Ignore differences in case."));
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::OK).is_none());
        assert!(classify_status(StatusCode::TOO_MANY_REQUESTS)
            .unwrap()
            .is_transient());
        assert!(classify_status(StatusCode::BAD_GATEWAY).unwrap().is_transient());
        assert!(!classify_status(StatusCode::NOT_FOUND).unwrap().is_transient());
    }

    #[test]
    fn test_chat_url_trims_slash() {
        let config = ServiceConfig {
            base_url: "http://localhost:11434/".into(),
            ..ServiceConfig::default()
        };
        assert_eq!(OllamaService::new(&config).chat_url(), "http://localhost:11434/api/chat");
    }

    #[test]
    fn test_request_body_shape() {
        let body = ChatRequest {
            model: "llama3.2:3b",
            messages: vec![ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            }],
            stream: false,
            options: ChatOptions {
                temperature: 0.5,
                top_p: 0.25,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["options"]["top_p"], 0.25);
    }
}
