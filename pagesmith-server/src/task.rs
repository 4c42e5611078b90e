//! Task request and completion payload types.

use serde::{Deserialize, Serialize};
use url::Url;

/// GitHub's limit on repository name length.
const MAX_TASK_NAME_LEN: usize = 100;

/// Which pass over the artifact a request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Round {
    /// Round 1: generate and publish a new repository.
    Create,
    /// Round 2: revise the repository published in round 1.
    Revise,
}

impl TryFrom<u8> for Round {
    type Error = String;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            1 => Ok(Round::Create),
            2 => Ok(Round::Revise),
            other => Err(format!("round must be 1 or 2, got {other}")),
        }
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> u8 {
        match round {
            Round::Create => 1,
            Round::Revise => 2,
        }
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// A task name, usable verbatim as a repository name and URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskName(String);

impl TaskName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TaskName {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        if name.is_empty() || name.len() > MAX_TASK_NAME_LEN {
            return Err(format!(
                "task must be 1-{MAX_TASK_NAME_LEN} characters, got {}",
                name.len()
            ));
        }
        if name.starts_with('.') {
            return Err(format!("task must not start with '.': {name}"));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return Err(format!("task contains invalid character {bad:?}: {name}"));
        }
        Ok(TaskName(name))
    }
}

impl From<TaskName> for String {
    fn from(name: TaskName) -> String {
        name.0
    }
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named attachment. `url` is either a link or an inline `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
}

/// An inbound task, as admitted by [`crate::validate::validate`].
#[derive(Clone, Deserialize)]
pub struct TaskRequest {
    pub email: String,
    pub secret: String,
    pub task: TaskName,
    pub round: Round,
    /// Opaque correlation token, echoed back untouched.
    pub nonce: String,
    pub brief: String,
    pub checks: Vec<String>,
    pub evaluation_url: Url,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl std::fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRequest")
            .field("email", &self.email)
            .field("task", &self.task)
            .field("round", &self.round)
            .field("nonce", &self.nonce)
            .field("brief", &self.brief)
            .field("checks", &self.checks)
            .field("evaluation_url", &self.evaluation_url.as_str())
            .field("attachments", &self.attachments.len())
            .finish_non_exhaustive()
    }
}

/// Where a round's output ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

/// Body of the evaluation callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationPayload {
    pub email: String,
    pub task: String,
    pub round: u8,
    pub nonce: String,
    pub repo_url: String,
    pub commit_sha: String,
    pub pages_url: String,
}

impl EvaluationPayload {
    pub fn new(request: &TaskRequest, published: &PublishResult) -> Self {
        Self {
            email: request.email.clone(),
            task: request.task.to_string(),
            round: request.round.into(),
            nonce: request.nonce.clone(),
            repo_url: published.repo_url.clone(),
            commit_sha: published.commit_sha.clone(),
            pages_url: published.pages_url.clone(),
        }
    }
}
