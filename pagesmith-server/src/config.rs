//! Process-wide settings.
//!
//! Parsed once in `main` (flags, with environment fallbacks) and handed to
//! every component behind an `Arc`. Nothing reads the environment after
//! startup.

use std::time::Duration;

use clap::Parser;

/// Port used when neither `--listen-addr` nor `$PORT` is set.
const DEFAULT_PORT: u16 = 8000;

#[derive(Parser, Clone)]
#[command(
    name = "pagesmith-server",
    about = "Generates single-page web apps with an LLM and publishes them to GitHub Pages"
)]
pub struct Config {
    /// Address to listen on (host:port). Defaults to 0.0.0.0:$PORT, then 0.0.0.0:8000.
    #[arg(long, env = "PAGESMITH_ADDR")]
    pub listen_addr: Option<String>,

    /// Shared secret every task request must carry
    #[arg(long, env = "MY_SECRET", hide_env_values = true)]
    pub secret: String,

    /// GitHub personal access token (repo + pages scopes)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// GitHub account that owns the generated repositories
    #[arg(long, env = "GITHUB_USERNAME")]
    pub github_username: String,

    /// GitHub REST API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// Base URL Pages sites are served from (default: https://<username>.github.io)
    #[arg(long, env = "PAGES_BASE_URL")]
    pub pages_base_url: Option<String>,

    /// Token for the OpenAI-compatible AI proxy
    #[arg(long, env = "AIPIPE_TOKEN", hide_env_values = true)]
    pub ai_token: String,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://aipipe.org/openrouter/v1")]
    pub ai_base_url: String,

    /// Model used for generation
    #[arg(long, env = "PAGESMITH_MODEL", default_value = "openai/gpt-5-nano")]
    pub model: String,

    /// Webhook signing secret (reserved, currently unused)
    #[arg(long, env = "WEBHOOK_SECRET", hide_env_values = true)]
    pub webhook_secret: Option<String>,

    /// Per-request timeout for GitHub and callback calls, in seconds
    #[arg(long, env = "PAGESMITH_HTTP_TIMEOUT_SECS", default_value_t = 120)]
    pub http_timeout_secs: u64,

    /// Timeout for a single AI generation call, in seconds
    #[arg(long, env = "PAGESMITH_AI_TIMEOUT_SECS", default_value_t = 600)]
    pub ai_timeout_secs: u64,

    /// How long to keep retrying a failed evaluation callback, in seconds (0 = one attempt)
    #[arg(long, env = "PAGESMITH_NOTIFY_RETRY_SECS", default_value_t = 0)]
    pub notify_retry_secs: u64,

    /// Directory with the submission page, served at / and /static
    #[arg(long, env = "PAGESMITH_STATIC_DIR")]
    pub static_dir: Option<String>,
}

impl Config {
    /// Resolve the socket address to bind.
    pub fn listen_addr(&self) -> String {
        if let Some(ref addr) = self.listen_addr {
            return addr.clone();
        }
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);
        format!("0.0.0.0:{port}")
    }

    /// Base URL of the Pages host, without a trailing slash.
    pub fn pages_base_url(&self) -> String {
        match self.pages_base_url {
            Some(ref url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.github.io", self.github_username),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs)
    }

    pub fn notify_retry_window(&self) -> Duration {
        Duration::from_secs(self.notify_retry_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: Some("127.0.0.1:0".to_string()),
            secret: String::new(),
            github_token: String::new(),
            github_username: String::new(),
            github_api_url: "https://api.github.com".to_string(),
            pages_base_url: None,
            ai_token: String::new(),
            ai_base_url: "https://aipipe.org/openrouter/v1".to_string(),
            model: "openai/gpt-5-nano".to_string(),
            webhook_secret: None,
            http_timeout_secs: 120,
            ai_timeout_secs: 600,
            notify_retry_secs: 0,
            static_dir: None,
        }
    }
}

// Credentials never reach the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("secret", &"<redacted>")
            .field("github_token", &"<redacted>")
            .field("github_username", &self.github_username)
            .field("github_api_url", &self.github_api_url)
            .field("pages_base_url", &self.pages_base_url)
            .field("ai_token", &"<redacted>")
            .field("ai_base_url", &self.ai_base_url)
            .field("model", &self.model)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "<redacted>"))
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("ai_timeout_secs", &self.ai_timeout_secs)
            .field("notify_retry_secs", &self.notify_retry_secs)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}
