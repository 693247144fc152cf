use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DECLINE_ANSWER: &str = "I'm sorry, I don't have the information you're looking for.";
const EMPTY_CONTEXT_MARKER: &str = "(no relevant excerpts were found in the document)";

/// Assembles the system prompt for one chat turn from retrieved snippets.
///
/// When `context` is empty the prompt says so explicitly, so the model
/// declines instead of inventing an answer. That behavior is what makes the
/// empty-context-vs-error distinction upstream meaningful.
pub fn build_system_prompt(context: &[String]) -> String {
    let excerpts = if context.is_empty() {
        EMPTY_CONTEXT_MARKER.to_string()
    } else {
        context.join("\n\n")
    };

    format!(
        "Answer the user's query from the provided document context.\n\
         \n\
         CONTEXT:\n\
         {excerpts}\n\
         \n\
         RULES:\n\
         - Answer only from the context above.\n\
         - Use a conversational tone and keep the answer clear and concise.\n\
         - Reply in the language the user writes in.\n\
         - If the context does not cover the query, reply exactly: \"{DECLINE_ANSWER}\""
    )
}

/// One turn of answer generation. External collaborator: no retries, no
/// conversation state.
#[async_trait]
pub trait ChatModel {
    async fn generate(&self, system_prompt: &str, user_message: &str)
        -> Result<String, ChatError>;
}

/// Gemini `generateContent` adapter.
pub struct GeminiChat {
    endpoint: String,
    model: String,
    api_key: String,
    client: Client,
}

impl GeminiChat {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            client: Client::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    system_instruction: PromptContent,
    contents: Vec<TurnContent>,
}

#[derive(Debug, Serialize)]
struct PromptContent {
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TurnContent {
    role: String,
    parts: Vec<TextPart>,
}

#[derive(Debug, Serialize)]
struct TextPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateRequest {
    fn new(system_prompt: &str, user_message: &str) -> Self {
        Self {
            system_instruction: PromptContent {
                parts: vec![TextPart {
                    text: system_prompt.to_string(),
                }],
            },
            contents: vec![TurnContent {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: user_message.to_string(),
                }],
            }],
        }
    }
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        let text = self
            .candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect::<String>();

        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

#[async_trait]
impl ChatModel for GeminiChat {
    async fn generate(
        &self,
        system_prompt: &str,
        user_message: &str,
    ) -> Result<String, ChatError> {
        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.endpoint, self.model
            ))
            .query(&[("key", self.api_key.as_str())])
            .timeout(REQUEST_TIMEOUT)
            .json(&GenerateRequest::new(system_prompt, user_message))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return Err(ChatError::Provider {
                status: status.as_u16(),
                details,
            });
        }

        let payload: GenerateResponse = response.json().await?;
        payload.into_text().ok_or(ChatError::EmptyResponse)
    }
}
