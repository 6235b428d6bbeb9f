//! OpenAI-compatible chat completion client.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use super::NarrativeError;
use crate::config::AiConfig;

#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub role: &'static str,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct ChatCompletionClient {
    client: Client,
    api_url: Url,
    api_key: Option<String>,
    model: String,
}

impl ChatCompletionClient {
    pub fn new(client: Client, config: &AiConfig) -> Self {
        Self {
            client,
            api_url: config.api_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Sends one completion request and returns the trimmed reply text.
    pub async fn complete(
        &self,
        messages: &[Message],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, NarrativeError> {
        let api_key = self.api_key.as_deref().ok_or(NarrativeError::NotConfigured)?;

        let request = CompletionRequest {
            model: &self.model,
            messages,
            max_tokens,
            temperature,
        };

        let response = self
            .client
            .post(self.api_url.clone())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NarrativeError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| NarrativeError::Malformed("completion has no content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer, api_key: Option<&str>) -> AiConfig {
        AiConfig {
            api_url: format!("{}/v1/chat/completions", server.uri()).parse().unwrap(),
            api_key: api_key.map(str::to_string),
            model: "gpt-4o-mini".to_string(),
        }
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "max_tokens": 300,
                "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "hi"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "  hello there \n"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(Client::new(), &config(&server, Some("sk-test")));
        let reply = client
            .complete(&[Message::system("sys"), Message::user("hi")], 300, 0.7)
            .await
            .unwrap();
        assert_eq!(reply, "hello there");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let server = MockServer::start().await;
        let client = ChatCompletionClient::new(Client::new(), &config(&server, None));
        let err = client.complete(&[Message::user("hi")], 10, 0.7).await.unwrap_err();
        assert!(matches!(err, NarrativeError::NotConfigured));
    }

    #[tokio::test]
    async fn test_error_status_and_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let client = ChatCompletionClient::new(Client::new(), &config(&server, Some("k")));
        let err = client.complete(&[Message::user("hi")], 10, 0.7).await.unwrap_err();
        assert!(matches!(err, NarrativeError::Upstream { status: 429, .. }));
        let err = client.complete(&[Message::user("hi")], 10, 0.7).await.unwrap_err();
        assert!(matches!(err, NarrativeError::Malformed(_)));
    }
}
