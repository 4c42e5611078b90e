//! LLM client that turns a brief into a single-file HTML application.
//!
//! Talks to any OpenAI-compatible `chat/completions` endpoint (the default
//! is the AI Pipe proxy in front of OpenRouter).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::GenerateError;
use crate::task::{Round, TaskRequest};

const SYSTEM_PROMPT: &str = "You are a front-end engineer who ships complete, working single-file \
web applications. Reply with the HTML document only.";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generates application documents.
pub struct Generator {
    api_key: String,
    base_url: String,
    model: String,
    /// Overrides the client-wide timeout; generation runs far longer than a REST call.
    timeout: Duration,
    http: reqwest::Client,
}

impl Generator {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            api_key: config.ai_token.clone(),
            base_url: config.ai_base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.ai_timeout(),
            http,
        }
    }

    /// Produce the document for `request`. `existing` is the currently
    /// published document and is only consulted in round 2.
    pub async fn generate(
        &self,
        request: &TaskRequest,
        existing: Option<&str>,
    ) -> Result<String, GenerateError> {
        let prompt = build_prompt(request, existing);
        let answer = self.complete(SYSTEM_PROMPT, &prompt).await?;
        let document = strip_code_fences(&answer);
        if document.is_empty() {
            return Err(GenerateError::Empty);
        }
        tracing::debug!(
            task = %request.task,
            chars = document.len(),
            "Generated document"
        );
        Ok(document)
    }

    /// Single-turn completion.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, GenerateError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerateError::Status { status, body });
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(GenerateError::Empty)
    }
}

/// Build the user prompt for either round.
pub fn build_prompt(request: &TaskRequest, existing: Option<&str>) -> String {
    let mut prompt = match (request.round, existing) {
        (Round::Revise, Some(code)) => format!(
            "Given the current code below, update the application to satisfy this new requirement: {brief}\n\n\
             Current code:\n{code}\n\n\
             Keep everything that already works. Provide the complete updated HTML file with all HTML, CSS, \
             and JavaScript in a single file. The application must stay fully functional and self-contained.",
            brief = request.brief,
        ),
        _ => format!(
            "Create a fully functional single-file HTML web application based on the following brief:\n\n\
             {brief}\n\n\
             Requirements:\n\
             - Create a complete, self-contained HTML file (index.html)\n\
             - Include all HTML, CSS (in <style> tags), and JavaScript (in <script> tags) in one file\n\
             - The application should be fully functional and ready to deploy\n\
             - Use modern web standards\n\
             - Make it visually appealing and user-friendly",
            brief = request.brief,
        ),
    };

    if !request.checks.is_empty() {
        prompt.push_str("\n\nThe page will be evaluated against these checks:\n");
        for check in &request.checks {
            prompt.push_str(&format!("- {check}\n"));
        }
    }

    if !request.attachments.is_empty() {
        prompt.push_str("\n\nAdditional context/attachments:\n");
        for att in &request.attachments {
            prompt.push_str(&format!("- {}: {}\n", att.name, att.url));
        }
    }

    prompt
}

/// Pull the document out of a markdown code fence if the model wrapped it in one.
pub fn strip_code_fences(text: &str) -> String {
    let inner = if let Some((_, rest)) = text.split_once("```html") {
        rest.split("```").next().unwrap_or(rest)
    } else if let Some((_, rest)) = text.split_once("```") {
        rest.split("```").next().unwrap_or(rest)
    } else {
        text
    };
    inner.trim().to_string()
}
