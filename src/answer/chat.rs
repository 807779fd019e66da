/// OpenAI-compatible chat completion backend (Groq by default)
use super::{AnswerComposer, AnswerError, ContextDocument};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Sampling parameters sent with every completion
#[derive(Debug, Clone)]
pub struct ChatOptions {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: f32,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            model: "llama3-70b-8192".to_string(),
            temperature: 0.4,
            max_tokens: 800,
            top_p: 0.9,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct ChatCompletionComposer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    options: ChatOptions,
}

impl ChatCompletionComposer {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>, options: ChatOptions) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key,
            options,
        }
    }

    fn build_prompt(query: &str, context: &[ContextDocument]) -> String {
        let mut prompt = String::from(
            "Answer the question using only the policy excerpts below. \
             If they do not contain the answer, say so.\n\n",
        );

        for (i, doc) in context.iter().enumerate() {
            let label = if doc.policy.is_empty() {
                doc.id.as_str()
            } else {
                doc.policy.as_str()
            };
            prompt.push_str(&format!("[{}] {}\n{}\n\n", i + 1, label, doc.excerpt));
        }

        prompt.push_str(&format!("Question: {}\nAnswer:", query));
        prompt
    }
}

#[async_trait]
impl AnswerComposer for ChatCompletionComposer {
    async fn compose(&self, query: &str, context: &[ContextDocument]) -> Result<String, AnswerError> {
        let body = ChatRequest {
            model: &self.options.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::build_prompt(query, context),
            }],
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            top_p: self.options.top_p,
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AnswerError::Unavailable(e.to_string()))?;

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnswerError::Unavailable(format!("invalid response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(AnswerError::EmptyResponse)
    }

    fn name(&self) -> &str {
        &self.options.model
    }
}
