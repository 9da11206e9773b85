use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use super::{parse_reply, DateResolver};
use crate::common::error::{Result, ScraperError};
use crate::config::ResolverConfig;
use crate::metrics::ResolverMetrics;
use crate::rate_limiter::{Limits, RateLimiter};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Resolver backed by an OpenAI-compatible chat completions endpoint.
///
/// One request per raw string, no retries. Calls share a `RateLimiter` so
/// concurrent sources cannot fan out past the configured budget.
pub struct OpenAiDateResolver {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    limiter: RateLimiter,
}

impl OpenAiDateResolver {
    pub fn new(config: &ResolverConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let limiter = RateLimiter::new(Limits {
            requests_per_min: config.requests_per_min,
            concurrency: config.concurrency,
        });
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            limiter,
        })
    }

    async fn request(&self, raw_date: &str, current_year: i32) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(raw_date, current_year),
            }],
            temperature: 0.0,
        };

        let response: ChatResponse = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ScraperError::Resolver("reply had no choices".into()))
    }
}

#[async_trait]
impl DateResolver for OpenAiDateResolver {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self), fields(model = %self.model))]
    async fn resolve(&self, raw_date: &str, current_year: i32) -> Vec<NaiveDate> {
        let _permit = self.limiter.acquire().await;
        let started = Instant::now();

        let dates = match self.request(raw_date, current_year).await {
            Ok(reply) => {
                debug!("Resolver replied '{}'", reply.trim());
                parse_reply(&reply)
            }
            Err(e) => {
                warn!("Resolver call failed for '{}': {}", raw_date, e);
                Vec::new()
            }
        };

        ResolverMetrics::record_call(started.elapsed().as_secs_f64(), !dates.is_empty());
        dates
    }
}

/// Instructions sent with every raw date string
pub fn build_prompt(raw_date: &str, current_year: i32) -> String {
    format!(
        "Extract the date from the following string and return it in YYYY-MM-DD format.\n\
         If no year is present, assume the year is {current_year}.\n\
         If the string contains multiple dates or a range of dates, return each boundary date \
         separated by ', ' (for example: 2025-01-01, 2025-01-02).\n\
         Reply with the dates only.\n\
         String: {raw_date}"
    )
}
