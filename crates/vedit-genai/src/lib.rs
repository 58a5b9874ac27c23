//! Client for a generative multimodal model service (Gemini REST API).
//!
//! Requests carry ordered text/image parts plus an optional JSON response
//! schema; replies carry schema-constrained text or inline binary image
//! data. Rate-limit failures are classified distinctly from other API
//! errors so callers can back off and retry them.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GenAiClient, GenAiConfig};
pub use error::{classify_api_error, GenAiError, GenAiResult};
pub use types::{Content, GenerateRequest, ModelResponse, Part, ResponsePart};
