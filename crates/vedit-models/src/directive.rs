//! Edit directives produced by the plan stage.

use serde::{Deserialize, Serialize};

/// One planned edit: a position into the retrieved frame list plus the
/// free-text prompt to apply to that frame.
///
/// `image_index` is 0-based and addresses the time-windowed retrieval
/// result, not the video's global frame numbering. Directives are
/// ephemeral; they are consumed by edit execution and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditDirective {
    pub image_index: usize,
    pub image_prompt: String,
}
