//! Evaluation callback delivery.

use std::time::Duration;

use url::Url;

use crate::error::NotifyError;
use crate::task::EvaluationPayload;

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
/// Deadline used when the configured window does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub struct Notifier {
    http: reqwest::Client,
    retry_window: Duration,
}

impl Notifier {
    /// `retry_window` of zero means exactly one attempt.
    pub fn new(http: reqwest::Client, retry_window: Duration) -> Self {
        Self { http, retry_window }
    }

    /// POST `payload` to `url`, retrying with exponential backoff until the
    /// retry window runs out. Returns the last error if nothing got through.
    pub async fn notify(&self, url: &Url, payload: &EvaluationPayload) -> Result<(), NotifyError> {
        let now = tokio::time::Instant::now();
        let deadline = now
            .checked_add(self.retry_window)
            .unwrap_or_else(|| now + FAR_FUTURE);
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 1u32;

        loop {
            let err = match self.send_once(url, payload).await {
                Ok(()) => {
                    tracing::info!(task = %payload.task, url = %url, attempt, "Evaluation callback delivered");
                    return Ok(());
                }
                Err(e) => e,
            };

            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                return Err(err);
            }
            let wait = backoff.min(remaining);
            tracing::warn!(
                task = %payload.task,
                attempt,
                error = %err,
                "Evaluation callback failed, retrying in {}s",
                wait.as_secs_f32()
            );
            tokio::time::sleep(wait).await;
            backoff = (backoff * 2).min(MAX_BACKOFF);
            attempt += 1;
        }
    }

    async fn send_once(&self, url: &Url, payload: &EvaluationPayload) -> Result<(), NotifyError> {
        let resp = self.http.post(url.clone()).json(payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Status { status, body });
        }
        Ok(())
    }
}
