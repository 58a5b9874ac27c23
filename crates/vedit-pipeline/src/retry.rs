//! Retry with exponential backoff for rate-limited model calls.

use std::time::Duration;

use tracing::warn;

use vedit_genai::{GenAiError, GenerateRequest, ModelResponse};

use crate::traits::GenerativeModel;

/// Issue a model call, retrying rate-limited failures with exponential
/// backoff (`base_delay * 2^attempt`).
///
/// `max_attempts` counts every call including the first. Only rate-limit
/// errors are retried; anything else fails immediately. Exhausting the
/// attempt budget surfaces the final rate-limit error.
pub async fn generate_with_backoff<M>(
    model: &M,
    request: &GenerateRequest,
    max_attempts: u32,
    base_delay: Duration,
) -> Result<ModelResponse, GenAiError>
where
    M: GenerativeModel + ?Sized,
{
    let mut attempt = 0u32;
    loop {
        match model.generate(request).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_rate_limited() && attempt + 1 < max_attempts => {
                let delay = base_delay.saturating_mul(2u32.saturating_pow(attempt));
                warn!(
                    model = %request.model,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "Rate limit hit, backing off before retry"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
