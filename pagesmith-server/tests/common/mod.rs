//! In-process stand-ins for the AI provider, the GitHub REST API and the
//! evaluation receiver, all served from one axum app on 127.0.0.1:0.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::Engine;
use tokio::sync::mpsc;

use pagesmith_server::config::Config;
use pagesmith_server::task::{EvaluationPayload, TaskRequest};

pub const SECRET: &str = "test-secret";
pub const OWNER: &str = "octo";
pub const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub content: String,
    pub sha: String,
}

#[derive(Debug, Clone)]
pub struct FakeRepo {
    pub html_url: String,
    pub files: HashMap<String, FakeFile>,
    pub pages: bool,
}

pub struct FakeState {
    pub repos: Mutex<HashMap<String, FakeRepo>>,
    pub prompts: Mutex<Vec<String>>,
    pub ai_fails: AtomicBool,
    /// Milliseconds the AI provider takes to answer.
    pub ai_delay_ms: AtomicU64,
    /// Serve contents the way GitHub does for files over 1 MB: no inline
    /// payload, only a blob SHA.
    pub large_files: AtomicBool,
    /// New repositories come up with Pages already on.
    pub pages_preenabled: AtomicBool,
    /// Callback requests to answer with 503 before accepting one.
    pub callback_failures: AtomicUsize,
    pub callback_attempts: AtomicUsize,
    /// Every write against the fake GitHub (repo, file, pages).
    pub mutations: AtomicUsize,
    commits: AtomicUsize,
    callback_tx: mpsc::UnboundedSender<EvaluationPayload>,
}

impl FakeState {
    pub fn repo(&self, name: &str) -> Option<FakeRepo> {
        self.repos.lock().unwrap().get(name).cloned()
    }

    pub fn add_repo(&self, name: &str, files: &[(&str, &str)]) {
        let files = files
            .iter()
            .enumerate()
            .map(|(i, (path, content))| {
                (
                    path.to_string(),
                    FakeFile {
                        content: content.to_string(),
                        sha: format!("seed-{i}"),
                    },
                )
            })
            .collect();
        self.repos.lock().unwrap().insert(
            name.to_string(),
            FakeRepo {
                html_url: format!("https://github.test/{OWNER}/{name}"),
                files,
                pages: true,
            },
        );
    }
}

pub struct Fake {
    pub addr: SocketAddr,
    pub state: Arc<FakeState>,
    pub callbacks: mpsc::UnboundedReceiver<EvaluationPayload>,
}

impl Fake {
    pub async fn start() -> Fake {
        let (callback_tx, callbacks) = mpsc::unbounded_channel();
        let state = Arc::new(FakeState {
            repos: Mutex::new(HashMap::new()),
            prompts: Mutex::new(Vec::new()),
            ai_fails: AtomicBool::new(false),
            ai_delay_ms: AtomicU64::new(0),
            large_files: AtomicBool::new(false),
            pages_preenabled: AtomicBool::new(false),
            callback_failures: AtomicUsize::new(0),
            callback_attempts: AtomicUsize::new(0),
            mutations: AtomicUsize::new(0),
            commits: AtomicUsize::new(0),
            callback_tx,
        });

        let app = Router::new()
            .route("/chat/completions", post(chat))
            .route("/user/repos", post(create_repo))
            .route("/repos/{owner}/{repo}", get(get_repo))
            .route(
                "/repos/{owner}/{repo}/contents/{path}",
                get(get_contents).put(put_contents),
            )
            .route("/repos/{owner}/{repo}/git/blobs/{sha}", get(get_blob))
            .route("/repos/{owner}/{repo}/pages", post(enable_pages))
            .route("/callback", post(callback))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Fake {
            addr,
            state,
            callbacks,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn callback_url(&self) -> String {
        format!("http://{}/callback", self.addr)
    }

    /// Server config pointing every outbound call at this fake.
    pub fn config(&self) -> Config {
        Config {
            secret: SECRET.to_string(),
            github_token: "ghp_test".to_string(),
            github_username: OWNER.to_string(),
            github_api_url: self.url(),
            pages_base_url: Some(format!("https://{OWNER}.github.io")),
            ai_token: "ai-test".to_string(),
            ai_base_url: self.url(),
            http_timeout_secs: 5,
            ..Default::default()
        }
    }

    /// Wait for the next evaluation callback.
    pub async fn next_callback(&mut self) -> EvaluationPayload {
        tokio::time::timeout(TIMEOUT, self.callbacks.recv())
            .await
            .expect("timed out waiting for evaluation callback")
            .expect("callback channel closed")
    }

    pub fn no_callback_yet(&mut self) -> bool {
        self.callbacks.try_recv().is_err()
    }
}

/// JSON body for a task submission.
pub fn task_body(
    task: &str,
    round: u8,
    nonce: &str,
    brief: &str,
    evaluation_url: &str,
) -> serde_json::Value {
    serde_json::json!({
        "email": "student@example.com",
        "secret": SECRET,
        "task": task,
        "round": round,
        "nonce": nonce,
        "brief": brief,
        "checks": [],
        "evaluation_url": evaluation_url,
    })
}

pub fn task_request(body: &serde_json::Value) -> TaskRequest {
    pagesmith_server::validate::validate(&serde_json::to_vec(body).unwrap(), SECRET).unwrap()
}

// ── AI provider ────────────────────────────────────────────────────────

async fn chat(State(state): State<Arc<FakeState>>, Json(body): Json<serde_json::Value>) -> Response {
    if state.ai_fails.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }
    let delay = state.ai_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    let prompt = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
    let n = {
        let mut prompts = state.prompts.lock().unwrap();
        prompts.push(prompt);
        prompts.len()
    };
    let content = format!(
        "Here is your app:\n```html\n<!DOCTYPE html><html><body>version {n}</body></html>\n```"
    );
    Json(serde_json::json!({
        "id": format!("chatcmpl-{n}"),
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }],
    }))
    .into_response()
}

// ── GitHub ─────────────────────────────────────────────────────────────

async fn create_repo(
    State(state): State<Arc<FakeState>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let mut repos = state.repos.lock().unwrap();
    if repos.contains_key(&name) {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "message": "Repository creation failed.",
                "errors": [{
                    "resource": "Repository",
                    "code": "custom",
                    "field": "name",
                    "message": "name already exists on this account",
                }],
            })),
        )
            .into_response();
    }
    let html_url = format!("https://github.test/{OWNER}/{name}");
    repos.insert(
        name,
        FakeRepo {
            html_url: html_url.clone(),
            files: HashMap::new(),
            pages: state.pages_preenabled.load(Ordering::SeqCst),
        },
    );
    state.mutations.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "html_url": html_url, "private": false })),
    )
        .into_response()
}

async fn get_repo(
    State(state): State<Arc<FakeState>>,
    Path((_owner, repo)): Path<(String, String)>,
) -> Response {
    match state.repo(&repo) {
        Some(r) => Json(serde_json::json!({ "html_url": r.html_url })).into_response(),
        None => not_found(),
    }
}

async fn get_contents(
    State(state): State<Arc<FakeState>>,
    Path((_owner, repo, path)): Path<(String, String, String)>,
) -> Response {
    let Some(file) = state.repo(&repo).and_then(|r| r.files.get(&path).cloned()) else {
        return not_found();
    };
    if state.large_files.load(Ordering::SeqCst) {
        return Json(serde_json::json!({
            "name": path,
            "path": path,
            "sha": file.sha,
            "size": file.content.len(),
            "encoding": "none",
            "content": "",
        }))
        .into_response();
    }
    Json(serde_json::json!({
        "name": path,
        "path": path,
        "sha": file.sha,
        "size": file.content.len(),
        "encoding": "base64",
        "content": wrapped_base64(&file.content),
    }))
    .into_response()
}

async fn get_blob(
    State(state): State<Arc<FakeState>>,
    Path((_owner, repo, sha)): Path<(String, String, String)>,
) -> Response {
    let Some(file) = state
        .repo(&repo)
        .and_then(|r| r.files.into_values().find(|f| f.sha == sha))
    else {
        return not_found();
    };
    Json(serde_json::json!({
        "sha": file.sha,
        "size": file.content.len(),
        "encoding": "base64",
        "content": wrapped_base64(&file.content),
    }))
    .into_response()
}

/// GitHub wraps base64 payloads at 60 columns.
fn wrapped_base64(content: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(content);
    encoded
        .as_bytes()
        .chunks(60)
        .map(|c| std::str::from_utf8(c).unwrap())
        .collect::<Vec<_>>()
        .join("\n")
}

async fn put_contents(
    State(state): State<Arc<FakeState>>,
    Path((_owner, repo, path)): Path<(String, String, String)>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    let mut repos = state.repos.lock().unwrap();
    let Some(r) = repos.get_mut(&repo) else {
        return not_found();
    };
    let given_sha = body["sha"].as_str();
    if let Some(existing) = r.files.get(&path)
        && given_sha != Some(existing.sha.as_str())
    {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "message": format!("{path} does not match") })),
        )
            .into_response();
    }
    let content = base64::engine::general_purpose::STANDARD
        .decode(body["content"].as_str().unwrap_or_default())
        .map(|b| String::from_utf8(b).unwrap())
        .unwrap();

    let n = state.commits.fetch_add(1, Ordering::SeqCst) + 1;
    let commit_sha = format!("{n:040x}");
    let blob_sha = format!("blob-{n}");
    r.files.insert(
        path.clone(),
        FakeFile {
            content,
            sha: blob_sha.clone(),
        },
    );
    state.mutations.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "content": { "path": path, "sha": blob_sha },
            "commit": { "sha": commit_sha, "message": body["message"] },
        })),
    )
        .into_response()
}

async fn enable_pages(
    State(state): State<Arc<FakeState>>,
    Path((_owner, repo)): Path<(String, String)>,
) -> Response {
    let mut repos = state.repos.lock().unwrap();
    let Some(r) = repos.get_mut(&repo) else {
        return not_found();
    };
    if r.pages {
        return (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "message": "GitHub Pages is already enabled." })),
        )
            .into_response();
    }
    r.pages = true;
    state.mutations.fetch_add(1, Ordering::SeqCst);
    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "html_url": format!("https://{OWNER}.github.io/{repo}/") })),
    )
        .into_response()
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "message": "Not Found" })),
    )
        .into_response()
}

// ── Evaluation receiver ────────────────────────────────────────────────

async fn callback(
    State(state): State<Arc<FakeState>>,
    Json(payload): Json<EvaluationPayload>,
) -> StatusCode {
    state.callback_attempts.fetch_add(1, Ordering::SeqCst);
    let failing = state
        .callback_failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::SERVICE_UNAVAILABLE;
    }
    let _ = state.callback_tx.send(payload);
    StatusCode::OK
}
