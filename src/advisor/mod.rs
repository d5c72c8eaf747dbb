pub mod dto;

use std::env;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;
use crate::models::HealthEntry;
use dto::{AnalysisReport, AnalyzeRequest, ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

#[derive(Clone, Debug)]
pub struct AdvisorConfig {
    pub analyze_url: String,
    pub api_key: String,
    pub chat_base_url: String,
    pub model: String,
}

impl AdvisorConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let api_key = env::var("LLM_API_KEY")
            .map_err(|_| AppError::BadRequest("LLM_API_KEY is not set".to_string()))?;
        let analyze_url = env::var("ANALYZE_URL")
            .unwrap_or_else(|_| "http://localhost:8000/analyze".to_string());
        let chat_base_url = env::var("LLM_BASE_URL")
            .unwrap_or_else(|_| "https://api.groq.com/openai/v1".to_string());
        let model = env::var("LLM_MODEL").unwrap_or_else(|_| "llama3-70b-8192".to_string());

        Ok(Self {
            analyze_url,
            api_key,
            chat_base_url,
            model,
        })
    }
}

/// The two delegated AI calls: the health analyzer service and the
/// chat-completions advice endpoint.
#[async_trait]
pub trait AdvisorClient: Send + Sync {
    async fn analyze(
        &self,
        entry: &HealthEntry,
        history: &[HealthEntry],
    ) -> Result<AnalysisReport, AppError>;

    async fn advise(
        &self,
        user_name: &str,
        symptoms: &str,
        history: Option<&str>,
    ) -> Result<String, AppError>;
}

pub struct HttpAdvisorClient {
    client: Client,
    config: AdvisorConfig,
}

impl HttpAdvisorClient {
    pub fn new(config: AdvisorConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::BadRequest(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn advice_prompt(user_name: &str, symptoms: &str, history: Option<&str>) -> String {
        format!(
            "You are a friendly wellness assistant for a personal diary app.\n\
             The user {} reports the following symptoms: {}.\n\
             Health history (if any): {}.\n\n\
             Give short, practical self-care advice in plain language: rest,\n\
             hydration, light exercise, sleep habits, and how to balance work\n\
             and downtime. Number the items. Do not use complex medical\n\
             terminology, do not diagnose, and do not prescribe medication.\n\
             Only recommend seeing a doctor when the symptoms warrant it.",
            user_name,
            symptoms,
            history.unwrap_or("none")
        )
    }
}

#[async_trait]
impl AdvisorClient for HttpAdvisorClient {
    async fn analyze(
        &self,
        entry: &HealthEntry,
        history: &[HealthEntry],
    ) -> Result<AnalysisReport, AppError> {
        let request_body = AnalyzeRequest {
            data: entry.into(),
            historical_data: history.iter().map(Into::into).collect(),
        };

        let response = self.client
            .post(&self.config.analyze_url)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Analyzer unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Analyzer error {}: {}", status, body)));
        }

        response
            .json::<AnalysisReport>()
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse analyzer response: {}", e);
                AppError::Upstream(format!("Failed to parse analyzer response: {}", e))
            })
    }

    async fn advise(
        &self,
        user_name: &str,
        symptoms: &str,
        history: Option<&str>,
    ) -> Result<String, AppError> {
        let url = format!("{}/chat/completions", self.config.chat_base_url);

        let request_body = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::advice_prompt(user_name, symptoms, history),
            }],
            max_tokens: 500,
            temperature: 0.7,
        };

        let response = self.client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Advice API unreachable: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Advice API error {}: {}", status, body)));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse advice response: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_else(|| "No advice available.".to_string()))
    }
}

/// Canned advisor for tests and for running without AI credentials.
pub struct NoopAdvisorClient;

#[async_trait]
impl AdvisorClient for NoopAdvisorClient {
    async fn analyze(
        &self,
        _entry: &HealthEntry,
        _history: &[HealthEntry],
    ) -> Result<AnalysisReport, AppError> {
        Ok(AnalysisReport {
            status: "normal".to_string(),
            trends: Default::default(),
            suggestions: vec!["Keep up the healthy routine!".to_string()],
        })
    }

    async fn advise(
        &self,
        _user_name: &str,
        _symptoms: &str,
        _history: Option<&str>,
    ) -> Result<String, AppError> {
        Ok("Rest well and drink plenty of water.".to_string())
    }
}
