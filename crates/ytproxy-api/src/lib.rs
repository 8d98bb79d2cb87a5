//! Axum HTTP API for the ytproxy backend.
//!
//! This crate provides:
//! - `GET /api/search` — free-text video search
//! - `GET /api/download` — streamed mp4/mp3 downloads via the subprocess
//!   pipeline, without buffering whole files
//! - Liveness probe, CORS, and request logging

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use session::DownloadSession;
pub use state::AppState;
