//! Per-request pipeline: generate → publish → notify.
//!
//! Each run owns its request and touches no state shared with other runs.
//! Two overlapping rounds for the same task are not serialized; GitHub's own
//! commit semantics decide the outcome.

use std::sync::Arc;

use crate::config::Config;
use crate::error::RunFailure;
use crate::generate::Generator;
use crate::notify::Notifier;
use crate::publish::Publisher;
use crate::task::{EvaluationPayload, PublishResult, Round, TaskRequest};

/// Where a run is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Accepted,
    /// Round 2 only: reading the currently published document.
    Fetching,
    Generating,
    Publishing,
    Notifying,
    Done,
    Failed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Accepted => write!(f, "accepted"),
            Phase::Fetching => write!(f, "fetching"),
            Phase::Generating => write!(f, "generating"),
            Phase::Publishing => write!(f, "publishing"),
            Phase::Notifying => write!(f, "notifying"),
            Phase::Done => write!(f, "done"),
            Phase::Failed => write!(f, "failed"),
        }
    }
}

pub struct Orchestrator {
    generator: Generator,
    publisher: Publisher,
    notifier: Notifier,
}

impl Orchestrator {
    /// Build all three clients around one shared HTTP connection pool.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent(concat!("pagesmith/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            generator: Generator::new(config, http.clone()),
            publisher: Publisher::new(config, http.clone()),
            notifier: Notifier::new(http, config.notify_retry_window()),
        })
    }

    /// Detach a run from the caller. The returned handle resolves to the
    /// terminal phase; callers are free to drop it.
    pub fn spawn(self: &Arc<Self>, request: TaskRequest) -> tokio::task::JoinHandle<Phase> {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.run(&request).await })
    }

    /// Run the whole pipeline, returning `Done` or `Failed`.
    pub async fn run(&self, request: &TaskRequest) -> Phase {
        tracing::info!(task = %request.task, round = %request.round, phase = %Phase::Accepted, "Run started");

        let published = match self.build(request).await {
            Ok(p) => p,
            Err(failure) => {
                tracing::error!(
                    task = %request.task,
                    round = %request.round,
                    phase = %failure.phase,
                    error = %failure.error,
                    "Run failed"
                );
                return Phase::Failed;
            }
        };

        let mut phase = Phase::Notifying;
        tracing::info!(
            task = %request.task,
            round = %request.round,
            %phase,
            commit = %published.commit_sha,
            pages_url = %published.pages_url,
            "Published"
        );
        let payload = EvaluationPayload::new(request, &published);
        if let Err(e) = self.notifier.notify(&request.evaluation_url, &payload).await {
            // Nobody left to tell; the run still counts as done.
            tracing::warn!(
                task = %request.task,
                round = %request.round,
                url = %request.evaluation_url,
                error = %e,
                "Evaluation callback not delivered"
            );
        }

        phase = Phase::Done;
        tracing::info!(task = %request.task, round = %request.round, %phase, "Run complete");
        phase
    }

    /// Generation and publishing, without the callback. A failure names
    /// the phase it happened in.
    pub async fn build(&self, request: &TaskRequest) -> Result<PublishResult, RunFailure> {
        let enter = |phase: Phase| {
            tracing::info!(task = %request.task, round = %request.round, %phase, "Phase changed");
            phase
        };

        let current = match request.round {
            Round::Create => None,
            Round::Revise => {
                let phase = enter(Phase::Fetching);
                let current = self
                    .publisher
                    .fetch_current(&request.task)
                    .await
                    .map_err(|e| RunFailure::new(phase, e))?;
                Some(current)
            }
        };

        let phase = enter(Phase::Generating);
        let document = self
            .generator
            .generate(request, current.as_ref().map(|c| c.content.as_str()))
            .await
            .map_err(|e| RunFailure::new(phase, e))?;

        let phase = enter(Phase::Publishing);
        tracing::debug!(task = %request.task, chars = document.len(), "Document generated");
        let published = match current {
            None => self.publisher.create(request, &document).await,
            Some(current) => self.publisher.revise(request, current, &document).await,
        };
        published.map_err(|e| RunFailure::new(phase, e))
    }
}
