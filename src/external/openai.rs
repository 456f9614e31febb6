use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::{
    config::Config,
    error::{upstream_error, Error},
    external::{ResponseMode, TextGenerator},
};

const SYSTEM_PROMPT: &str =
    "You are a travel planner. You only answer with itineraries of real, drivable places.";

#[derive(Clone, Debug)]
pub struct OpenAi {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

impl OpenAi {
    pub fn new(
        api_base: String,
        api_key: String,
        model: String,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base,
            api_key,
            model,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, Error> {
        Self::new(
            config.openai_api_base.clone(),
            config.openai_api_key.clone(),
            config.openai_model.clone(),
            config.request_timeout,
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, prompt: &str, mode: ResponseMode) -> serde_json::Value {
        let mut body = json!({
            "model": &self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.7
        });

        if mode == ResponseMode::Json {
            body["response_format"] = json!({ "type": "json_object" });
        }

        body
    }
}

// every non-200 reply to our own prompt is an upstream failure
fn check_status(status_code: u16) -> Result<(), Error> {
    if status_code != 200 {
        tracing::warn!("completion failed with status {}", status_code);
        return Err(upstream_error());
    }

    Ok(())
}

#[async_trait]
impl TextGenerator for OpenAi {
    #[tracing::instrument(skip(self, prompt), fields(model = %self.model))]
    async fn complete(&self, prompt: &str, mode: ResponseMode) -> Result<String, Error> {
        let url = format!("https://{}/v1/chat/completions", self.api_base);

        let res = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt, mode))
            .send()
            .await?;

        check_status(res.status().as_u16())?;

        let data: CompletionResponse = res.json().await?;

        data.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(upstream_error)
    }
}

#[test]
fn json_mode_requests_an_object() {
    let client = OpenAi::new(
        "api.openai.com".into(),
        "test-key".into(),
        "gpt-4o-mini".into(),
        Duration::from_secs(5),
    )
    .unwrap();

    let body = client.request_body("plan a trip", ResponseMode::Json);
    assert_eq!(body["response_format"]["type"], "json_object");
    assert_eq!(body["messages"][1]["content"], "plan a trip");

    let body = client.request_body("plan a trip", ResponseMode::Text);
    assert!(body.get("response_format").is_none());
    assert_eq!(client.model(), "gpt-4o-mini");
}

#[test]
fn rejected_completions_are_internal_errors() {
    use axum::{http::StatusCode, response::IntoResponse};

    assert_eq!(check_status(200), Ok(()));

    for status_code in [400, 401, 429, 500, 503] {
        let err = check_status(status_code).unwrap_err();
        assert_eq!(err, upstream_error());
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
