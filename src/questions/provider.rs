use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tracing::{debug, instrument, warn};

use super::fallback::fallback_questions;
use super::{QuizQuestion, QUESTION_COUNT};

const OPENROUTER_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const DEFAULT_MODEL: &str = "deepseek/deepseek-chat";

const SYSTEM_PROMPT: &str = "Ты эксперт по созданию вопросов для викторин. Твоя единственная задача — генерировать вопросы для викторины в очень специфическом формате JSON. НЕ включай никакой другой текст, объяснения или форматирование за пределами массива JSON. Массив JSON должен содержать ровно 50 УНИКАЛЬНЫХ и НЕПОВТОРЯЮЩИХСЯ вопросов. Каждый объект вопроса должен иметь поля \"question\" (строка), \"options\" (массив из 4 строк) и \"correct_answer\" (строка, точно соответствующая одному из вариантов). Все вопросы и варианты ответов должны быть НА РУССКОМ ЯЗЫКЕ.";

/// Produces the ordered question sequence for a game.
///
/// The contract is fail-open: implementations must return a usable set on
/// every call, substituting the static fallback when generation is not
/// possible. Callers never see a provider error.
#[async_trait]
pub trait QuestionProvider: Send + Sync {
    async fn fetch(&self, topic: &str) -> Vec<QuizQuestion>;
}

/// Internal failure modes of the upstream call. Absorbed inside the provider,
/// never returned to callers.
#[derive(Debug, thiserror::Error)]
enum ProviderError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("response contained no valid questions")]
    NoValidQuestions,
}

/// Question provider backed by the OpenRouter chat completions API.
pub struct OpenRouterQuestionProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
}

impl OpenRouterQuestionProvider {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model,
        }
    }

    /// Reads `OPENROUTER_API_KEY` and `OPENROUTER_MODEL` from the
    /// environment. A missing key is not an error; the provider will serve
    /// the fallback set.
    pub fn from_env() -> Self {
        let api_key = std::env::var("OPENROUTER_API_KEY").ok();
        let model =
            std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Self::new(api_key, model)
    }

    async fn fetch_upstream(
        &self,
        api_key: &str,
        topic: &str,
    ) -> Result<Vec<QuizQuestion>, ProviderError> {
        // Random nonce in the prompt so identical topics still produce fresh
        // sets; upstream caching would otherwise repeat question batches.
        let nonce: f64 = rand::rng().random();
        let user_prompt = format!(
            "Сгенерируй {QUESTION_COUNT} разнообразных, оригинальных и уникальных вопросов для викторины на различные темы, такие как: {topic}. \
             Каждый вопрос должен иметь 4 варианта ответа и один правильный ответ, который является частью вариантов. \
             Выводи только JSON массив вопросов. Вопросы и варианты ответов должны быть НА РУССКОМ ЯЗЫКЕ. \
             Игнорируй следующий случайный идентификатор: {nonce}."
        );

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": 0.9,
            "max_tokens": 8000
        });

        let response: serde_json::Value = self
            .client
            .post(OPENROUTER_URL)
            .bearer_auth(api_key)
            .header("X-Title", "Quiz Arena")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let content = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::Shape("missing choices[0].message.content".into()))?;

        debug!(content_len = content.len(), "Received generation response");

        let raw_array = extract_json_array(content)
            .ok_or_else(|| ProviderError::Shape("no JSON array in content".into()))?;

        let questions: Vec<QuizQuestion> = serde_json::from_str(raw_array)
            .map_err(|e| ProviderError::Shape(format!("array parse failed: {e}")))?;

        sanitize(questions)
    }
}

#[async_trait]
impl QuestionProvider for OpenRouterQuestionProvider {
    #[instrument(skip(self))]
    async fn fetch(&self, topic: &str) -> Vec<QuizQuestion> {
        let api_key = match &self.api_key {
            Some(key) => key.clone(),
            None => {
                warn!("OPENROUTER_API_KEY not set, using fallback questions");
                return fallback_questions();
            }
        };

        match self.fetch_upstream(&api_key, topic).await {
            Ok(questions) => {
                debug!(count = questions.len(), "Generated questions");
                questions
            }
            Err(e) => {
                warn!(error = %e, "Question generation failed, using fallback questions");
                fallback_questions()
            }
        }
    }
}

/// Pulls a bounded JSON-array substring out of a response that may wrap the
/// data in prose or a markdown fence.
fn extract_json_array(raw: &str) -> Option<&str> {
    // Prefer a fenced ```json block when the model emits one.
    if let Some(start) = raw.find("```json") {
        let rest = &raw[start + "```json".len()..];
        if let Some(end) = rest.find("```") {
            let inner = rest[..end].trim();
            if !inner.is_empty() {
                return Some(inner);
            }
        }
    }

    let open = raw.find('[')?;
    let close = raw.rfind(']')?;
    if open < close {
        Some(&raw[open..=close])
    } else {
        None
    }
}

/// Drops structurally invalid items and bounds the set to `QUESTION_COUNT`.
/// A short set is usable; an empty one is not.
fn sanitize(questions: Vec<QuizQuestion>) -> Result<Vec<QuizQuestion>, ProviderError> {
    let total = questions.len();
    let mut valid: Vec<QuizQuestion> = questions.into_iter().filter(|q| q.is_valid()).collect();

    if valid.len() < total {
        warn!(
            dropped = total - valid.len(),
            "Dropped malformed questions from generation response"
        );
    }

    if valid.is_empty() {
        return Err(ProviderError::NoValidQuestions);
    }

    if valid.len() > QUESTION_COUNT {
        warn!(
            generated = valid.len(),
            "Upstream returned more questions than requested, truncating"
        );
        valid.truncate(QUESTION_COUNT);
    } else if valid.len() < QUESTION_COUNT {
        warn!(
            generated = valid.len(),
            expected = QUESTION_COUNT,
            "Upstream returned fewer questions than requested, using what's available"
        );
    }

    Ok(valid)
}
