//! Edit plan stage.
//!
//! One model call maps the operator's prompt plus the retrieved frame set
//! to a list of per-frame edit directives.

use serde_json::json;
use tracing::warn;

use vedit_genai::{Content, GenerateRequest, Part};
use vedit_models::{EditDirective, Frame};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::traits::{GenerativeModel, ObjectStore};

const PLANNER_INSTRUCTIONS: &str = include_str!("../prompts/planner.md");

/// Outcome of the plan model call.
///
/// An empty or malformed textual reply is not an error here: it is kept
/// as `Unparsed` so the caller can decide to degrade to "no directives"
/// (the default) or escalate.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanReply {
    Parsed(Vec<EditDirective>),
    Unparsed(String),
}

impl PlanReply {
    /// Directives, treating an unparseable reply as an empty plan.
    pub fn directives_or_default(self) -> Vec<EditDirective> {
        match self {
            PlanReply::Parsed(directives) => directives,
            PlanReply::Unparsed(raw) => {
                warn!(
                    reply_len = raw.len(),
                    "Plan reply was not parseable, proceeding with no directives"
                );
                Vec::new()
            }
        }
    }
}

/// Ask the model which frames to edit and how.
///
/// The request carries the prompt first, then one content per retrieved
/// frame in list order; the reply is constrained to an array of
/// `{imageIndex, imagePrompt}` objects where `imageIndex` addresses the
/// retrieved list (0-based), not the video's global frame numbering.
pub async fn plan_edits<S, M>(
    store: &S,
    model: &M,
    config: &PipelineConfig,
    frames: &[Frame],
    prompt: &str,
) -> PipelineResult<PlanReply>
where
    S: ObjectStore + ?Sized,
    M: GenerativeModel + ?Sized,
{
    let mut request = GenerateRequest::new(&config.plan_model)
        .with_system_instruction(PLANNER_INSTRUCTIONS)
        .with_response_schema(plan_schema())
        .with_content(Content::user(vec![Part::text(prompt)]));

    for frame in frames {
        request = request.with_content(Content::user(vec![Part::file_ref(
            store.object_uri(&frame.object_path),
            "image/jpeg",
        )]));
    }

    let response = model.generate(&request).await?;
    Ok(parse_plan_reply(&response.text()))
}

/// Lenient parse of the plan reply text.
pub fn parse_plan_reply(text: &str) -> PlanReply {
    if text.is_empty() {
        return PlanReply::Unparsed(String::new());
    }
    match serde_json::from_str::<Vec<EditDirective>>(text) {
        Ok(directives) => PlanReply::Parsed(directives),
        Err(_) => PlanReply::Unparsed(text.to_string()),
    }
}

/// Pair each directive with its target frame, rejecting indices outside
/// the retrieved list.
pub fn resolve_directives(
    directives: Vec<EditDirective>,
    frames: &[Frame],
) -> PipelineResult<Vec<(Frame, String)>> {
    directives
        .into_iter()
        .map(|directive| {
            let frame = frames.get(directive.image_index).cloned().ok_or_else(|| {
                PipelineError::validation(format!(
                    "directive targets image index {} but only {} frames were retrieved",
                    directive.image_index,
                    frames.len()
                ))
            })?;
            Ok((frame, directive.image_prompt))
        })
        .collect()
}

fn plan_schema() -> serde_json::Value {
    json!({
        "type": "array",
        "items": {
            "type": "object",
            "properties": {
                "imageIndex": {"type": "integer"},
                "imagePrompt": {"type": "string"}
            },
            "required": ["imageIndex", "imagePrompt"]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryObjectStore, ScriptedModel};
    use vedit_models::{frame_object_key, VideoId};

    fn frames(n: u32) -> Vec<Frame> {
        let video_id = VideoId::new();
        (1..=n)
            .map(|index| Frame {
                video_id: video_id.clone(),
                frame_index: index,
                timestamp_millis: (index as u64 - 1) * 100,
                object_path: frame_object_key(&video_id, index),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_plan_parses_directive_array() {
        let store = MemoryObjectStore::new();
        let model = ScriptedModel::new();
        model.push_text(r#"[{"imageIndex": 1, "imagePrompt": "brighten the sky"}]"#);

        let reply = plan_edits(
            &store,
            &model,
            &PipelineConfig::default(),
            &frames(2),
            "make it sunny",
        )
        .await
        .unwrap();

        assert_eq!(
            reply,
            PlanReply::Parsed(vec![EditDirective {
                image_index: 1,
                image_prompt: "brighten the sky".to_string(),
            }])
        );
    }

    #[test]
    fn test_empty_reply_degrades_to_no_directives() {
        let reply = parse_plan_reply("");
        assert_eq!(reply, PlanReply::Unparsed(String::new()));
        assert!(reply.directives_or_default().is_empty());
    }

    #[test]
    fn test_malformed_reply_degrades_to_no_directives() {
        let reply = parse_plan_reply("I would rather not say.");
        assert!(matches!(reply, PlanReply::Unparsed(_)));
        assert!(reply.directives_or_default().is_empty());
    }

    #[test]
    fn test_out_of_bounds_directive_is_rejected() {
        let directives = vec![EditDirective {
            image_index: 5,
            image_prompt: "p".to_string(),
        }];
        let err = resolve_directives(directives, &frames(2)).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_resolve_pairs_directives_with_frames() {
        let frame_list = frames(3);
        let directives = vec![
            EditDirective {
                image_index: 0,
                image_prompt: "a".to_string(),
            },
            EditDirective {
                image_index: 2,
                image_prompt: "b".to_string(),
            },
        ];
        let resolved = resolve_directives(directives, &frame_list).unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].0.frame_index, 1);
        assert_eq!(resolved[1].0.frame_index, 3);
    }
}
