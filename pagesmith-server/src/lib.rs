//! pagesmith: turns a task brief into a single-page web app, publishes it to
//! GitHub Pages and reports the result to an evaluation callback.
//!
//! A task arrives on `POST /api-endpoint`, is validated and acknowledged at
//! once, and the generate → publish → notify chain runs detached from the
//! request.

pub mod config;
pub mod error;
pub mod files;
pub mod generate;
pub mod notify;
pub mod orchestrator;
pub mod publish;
pub mod task;
pub mod validate;
pub mod web;
