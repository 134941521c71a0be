//! Client for SGLang vision-language model servers.
//!
//! Each configured model runs behind its own SGLang server exposing
//! `GET /health` and the OpenAI-compatible `POST /v1/chat/completions`.
//! This crate checks readiness and sends one video inference request
//! per call.

pub mod client;
pub mod error;
pub mod health;
pub mod types;

pub use client::{ClientConfig, SglangClient};
pub use error::{error_chain, ClientError, ClientResult};
pub use health::{check_all, HealthReport, HealthStatus};
pub use types::{ChatRequest, ChatResponse};
