// src/lib.rs
// Public library surface shared by the proxy server, the CLI client and integration tests.

pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod news;
pub mod normalize;
pub mod render;
pub mod telemetry;
pub mod upstream;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::board::{BoardState, NewsBoard, Ticket};
pub use crate::error::FetchError;
pub use crate::fetch::{first_success, FallbackOrchestrator, NewsStrategy};
pub use crate::news::{NewsEnvelope, NewsItem, SourceCitation};
