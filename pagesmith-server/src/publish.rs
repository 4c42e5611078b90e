//! GitHub publisher.
//!
//! Round 1 creates a public repository named after the task, commits
//! `index.html`, `LICENSE` and `README.md`, then turns on Pages for `main`.
//! Round 2 replaces `index.html` and `README.md` in the existing repository
//! and leaves `LICENSE` alone.
//!
//! Uses the REST contents API, so every file write is its own commit; the
//! reported commit is the last one written.

use base64::Engine;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Deserialize;

use crate::config::Config;
use crate::error::PublishError;
use crate::files;
use crate::task::{PublishResult, Round, TaskName, TaskRequest};

pub const DOCUMENT_PATH: &str = "index.html";
pub const LICENSE_PATH: &str = "LICENSE";
pub const README_PATH: &str = "README.md";
const BRANCH: &str = "main";

#[derive(Debug, Deserialize)]
struct Repository {
    html_url: String,
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    sha: String,
    #[serde(default)]
    content: String,
    /// `base64`, or `none` when the file is over 1 MB and must be read as a blob.
    #[serde(default)]
    encoding: Option<String>,
    #[serde(default)]
    size: u64,
}

impl ContentsEntry {
    /// Whether `content` actually carries the file.
    fn is_inline(&self) -> bool {
        matches!(self.encoding.as_deref(), Some("base64") | None)
            && !(self.content.is_empty() && self.size > 0)
    }
}

#[derive(Debug, Deserialize)]
struct Blob {
    content: String,
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct CommitRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct PutContentsResponse {
    commit: CommitRef,
}

/// The document currently served for a task, as fetched before round 2.
#[derive(Debug, Clone)]
pub struct CurrentDocument {
    pub content: String,
    sha: String,
    repo_url: String,
}

pub struct Publisher {
    api_url: String,
    token: String,
    owner: String,
    pages_base_url: String,
    http: reqwest::Client,
}

impl Publisher {
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            api_url: config.github_api_url.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
            owner: config.github_username.clone(),
            pages_base_url: config.pages_base_url(),
            http,
        }
    }

    /// Round 1: new repository, three files, Pages on.
    pub async fn create(
        &self,
        request: &TaskRequest,
        document: &str,
    ) -> Result<PublishResult, PublishError> {
        let task = &request.task;
        let now = chrono::Utc::now();

        let repo = self.create_repository(task, &files::description(&request.brief)).await?;
        tracing::info!(%task, repo = %repo.html_url, "Repository created");

        self.put_file(task, DOCUMENT_PATH, "Add index.html", document, None)
            .await?;
        self.put_file(
            task,
            LICENSE_PATH,
            "Add MIT License",
            &files::license(&self.owner, now),
            None,
        )
        .await?;
        let commit_sha = self
            .put_file(
                task,
                README_PATH,
                "Add README",
                &files::readme(task.as_str(), &request.brief, Round::Create, now),
                None,
            )
            .await?;

        self.enable_pages(task).await?;

        Ok(PublishResult {
            repo_url: repo.html_url,
            commit_sha,
            pages_url: self.pages_url(task),
        })
    }

    /// Round 2 input: the document as currently committed.
    pub async fn fetch_current(&self, task: &TaskName) -> Result<CurrentDocument, PublishError> {
        let repo = self.get_repository(task).await?;
        let entry = self
            .find_file(task, DOCUMENT_PATH)
            .await?
            .ok_or_else(|| PublishError::FileNotFound {
                repo: task.to_string(),
                path: DOCUMENT_PATH.to_string(),
            })?;
        let content = if entry.is_inline() {
            decode_content(DOCUMENT_PATH, &entry.content)?
        } else {
            tracing::debug!(%task, size = entry.size, "Document too large for contents API, reading blob");
            self.read_blob(task, DOCUMENT_PATH, &entry.sha).await?
        };
        Ok(CurrentDocument {
            content,
            sha: entry.sha,
            repo_url: repo.html_url,
        })
    }

    /// Round 2: replace the document and readme on top of `current`.
    pub async fn revise(
        &self,
        request: &TaskRequest,
        current: CurrentDocument,
        document: &str,
    ) -> Result<PublishResult, PublishError> {
        let task = &request.task;
        let now = chrono::Utc::now();

        let message = format!(
            "Round 2: update application - {}...",
            files::truncate(&request.brief, 50)
        );
        self.put_file(task, DOCUMENT_PATH, &message, document, Some(&current.sha))
            .await?;

        let readme_sha = self.find_file(task, README_PATH).await?.map(|e| e.sha);
        let commit_sha = self
            .put_file(
                task,
                README_PATH,
                "Update README for round 2",
                &files::readme(task.as_str(), &request.brief, Round::Revise, now),
                readme_sha.as_deref(),
            )
            .await?;

        Ok(PublishResult {
            repo_url: current.repo_url,
            commit_sha,
            pages_url: self.pages_url(task),
        })
    }

    /// Public URL the task is served at.
    pub fn pages_url(&self, task: &TaskName) -> String {
        format!("{}/{}/", self.pages_base_url, task)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.api_url, path))
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn create_repository(
        &self,
        task: &TaskName,
        description: &str,
    ) -> Result<Repository, PublishError> {
        let resp = self
            .request(Method::POST, "/user/repos")
            .json(&serde_json::json!({
                "name": task.as_str(),
                "description": description,
                "private": false,
                "auto_init": false,
            }))
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            let body = resp.text().await.unwrap_or_default();
            if body.contains("already exists") {
                return Err(PublishError::RepositoryExists(task.to_string()));
            }
            return Err(PublishError::Status {
                action: "create repository",
                status,
                body,
            });
        }
        if !status.is_success() {
            return Err(status_error("create repository", resp).await);
        }
        Ok(resp.json().await?)
    }

    async fn get_repository(&self, task: &TaskName) -> Result<Repository, PublishError> {
        let resp = self
            .request(Method::GET, &format!("/repos/{}/{}", self.owner, task))
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(PublishError::RepositoryNotFound(task.to_string()));
        }
        if !resp.status().is_success() {
            return Err(status_error("look up repository", resp).await);
        }
        Ok(resp.json().await?)
    }

    /// `None` when the file does not exist on the branch.
    async fn find_file(
        &self,
        task: &TaskName,
        path: &str,
    ) -> Result<Option<ContentsEntry>, PublishError> {
        let resp = self
            .request(
                Method::GET,
                &format!("/repos/{}/{}/contents/{}", self.owner, task, path),
            )
            .query(&[("ref", BRANCH)])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(status_error("read file", resp).await);
        }
        Ok(Some(resp.json().await?))
    }

    /// Read a file through the git data API, which has no 1 MB cap.
    async fn read_blob(
        &self,
        task: &TaskName,
        path: &str,
        sha: &str,
    ) -> Result<String, PublishError> {
        let resp = self
            .request(
                Method::GET,
                &format!("/repos/{}/{}/git/blobs/{}", self.owner, task, sha),
            )
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error("read blob", resp).await);
        }
        let blob: Blob = resp.json().await?;
        if blob.encoding != "base64" {
            return Err(PublishError::Content {
                path: path.to_string(),
                reason: format!("unsupported blob encoding {}", blob.encoding),
            });
        }
        decode_content(path, &blob.content)
    }

    /// Create or replace one file; returns the new commit's SHA.
    async fn put_file(
        &self,
        task: &TaskName,
        path: &str,
        message: &str,
        content: &str,
        sha: Option<&str>,
    ) -> Result<String, PublishError> {
        let mut body = serde_json::json!({
            "message": message,
            "content": base64::engine::general_purpose::STANDARD.encode(content),
            "branch": BRANCH,
        });
        if let Some(sha) = sha {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }

        let resp = self
            .request(
                Method::PUT,
                &format!("/repos/{}/{}/contents/{}", self.owner, task, path),
            )
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(status_error("write file", resp).await);
        }
        let written: PutContentsResponse = resp.json().await?;
        tracing::debug!(%task, path, commit = %written.commit.sha, "Committed file");
        Ok(written.commit.sha)
    }

    async fn enable_pages(&self, task: &TaskName) -> Result<(), PublishError> {
        let resp = self
            .request(
                Method::POST,
                &format!("/repos/{}/{}/pages", self.owner, task),
            )
            .json(&serde_json::json!({
                "source": { "branch": BRANCH, "path": "/" }
            }))
            .send()
            .await?;
        match resp.status() {
            StatusCode::CREATED => {
                tracing::info!(%task, "GitHub Pages enabled");
                Ok(())
            }
            StatusCode::CONFLICT => {
                tracing::info!(%task, "GitHub Pages already enabled");
                Ok(())
            }
            _ => Err(status_error("enable pages", resp).await),
        }
    }
}

async fn status_error(action: &'static str, resp: reqwest::Response) -> PublishError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    PublishError::Status {
        action,
        status,
        body,
    }
}

/// The contents API returns base64 wrapped at 60 columns.
fn decode_content(path: &str, encoded: &str) -> Result<String, PublishError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| PublishError::Content {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
    String::from_utf8(bytes).map_err(|e| PublishError::Content {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
