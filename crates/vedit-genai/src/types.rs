//! Request and response types for the generateContent endpoint.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{GenAiError, GenAiResult};

/// One piece of ordered multimodal content.
#[derive(Debug, Clone)]
pub enum Part {
    /// Plain text
    Text(String),
    /// Reference to an image already in object storage
    FileRef { uri: String, mime_type: String },
    /// Raw image bytes carried inline
    InlineImage { mime_type: String, data: Vec<u8> },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn file_ref(uri: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self::FileRef {
            uri: uri.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// An ordered group of parts attributed to one role.
#[derive(Debug, Clone)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

impl Content {
    /// User-role content.
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: "user".to_string(),
            parts,
        }
    }
}

/// A generateContent request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Model to call
    pub model: String,
    /// Fixed system-instruction document, if any
    pub system_instruction: Option<String>,
    /// Ordered user contents
    pub contents: Vec<Content>,
    /// JSON schema constraining the reply; when set the reply is
    /// requested as `application/json`
    pub response_schema: Option<serde_json::Value>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            contents: Vec::new(),
            response_schema: None,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        self.response_schema = Some(schema);
        self
    }
}

/// One part of a model reply.
#[derive(Debug, Clone)]
pub enum ResponsePart {
    Text(String),
    InlineImage { mime_type: String, data: Vec<u8> },
}

/// A model reply, decoded from the first candidate.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub parts: Vec<ResponsePart>,
}

impl ModelResponse {
    /// A reply consisting of one text part.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![ResponsePart::Text(text.into())],
        }
    }

    /// A reply consisting of one inline image part.
    pub fn from_inline_image(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            parts: vec![ResponsePart::InlineImage {
                mime_type: mime_type.into(),
                data,
            }],
        }
    }

    /// Concatenated text parts, trimmed, with markdown code fences
    /// stripped (models wrap JSON replies in ```json fences at times).
    pub fn text(&self) -> String {
        let mut combined = String::new();
        for part in &self.parts {
            if let ResponsePart::Text(text) = part {
                combined.push_str(text);
            }
        }
        strip_code_fences(combined.trim()).trim().to_string()
    }

    /// The first inline binary image payload, if the reply carries one.
    pub fn first_inline_image(&self) -> Option<&[u8]> {
        self.parts.iter().find_map(|part| match part {
            ResponsePart::InlineImage { data, .. } => Some(data.as_slice()),
            _ => None,
        })
    }
}

fn strip_code_fences(text: &str) -> &str {
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text)
}

// Wire format -----------------------------------------------------------

#[derive(Debug, Serialize)]
pub(crate) struct WireRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    generation_config: Option<WireGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct WireContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<WirePart>,
}

#[derive(Debug, Serialize)]
struct WirePart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<WireFileData>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<WireInlineData>,
}

#[derive(Debug, Serialize)]
struct WireFileData {
    #[serde(rename = "fileUri")]
    file_uri: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireInlineData {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct WireGenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

impl From<&Part> for WirePart {
    fn from(part: &Part) -> Self {
        match part {
            Part::Text(text) => WirePart {
                text: Some(text.clone()),
                file_data: None,
                inline_data: None,
            },
            Part::FileRef { uri, mime_type } => WirePart {
                text: None,
                file_data: Some(WireFileData {
                    file_uri: uri.clone(),
                    mime_type: mime_type.clone(),
                }),
                inline_data: None,
            },
            Part::InlineImage { mime_type, data } => WirePart {
                text: None,
                file_data: None,
                inline_data: Some(WireInlineData {
                    mime_type: mime_type.clone(),
                    data: BASE64.encode(data),
                }),
            },
        }
    }
}

impl From<&GenerateRequest> for WireRequest {
    fn from(request: &GenerateRequest) -> Self {
        WireRequest {
            system_instruction: request.system_instruction.as_ref().map(|text| WireContent {
                role: None,
                parts: vec![WirePart {
                    text: Some(text.clone()),
                    file_data: None,
                    inline_data: None,
                }],
            }),
            contents: request
                .contents
                .iter()
                .map(|content| WireContent {
                    role: Some(content.role.clone()),
                    parts: content.parts.iter().map(WirePart::from).collect(),
                })
                .collect(),
            generation_config: request.response_schema.as_ref().map(|schema| {
                WireGenerationConfig {
                    response_mime_type: "application/json".to_string(),
                    response_schema: schema.clone(),
                }
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireResponse {
    #[serde(default)]
    candidates: Vec<WireCandidate>,
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    content: Option<WireResponseContent>,
}

#[derive(Debug, Deserialize)]
struct WireResponseContent {
    #[serde(default)]
    parts: Vec<WireResponsePart>,
}

#[derive(Debug, Deserialize)]
struct WireResponsePart {
    text: Option<String>,
    #[serde(rename = "inlineData")]
    inline_data: Option<WireInlineData>,
}

impl TryFrom<WireResponse> for ModelResponse {
    type Error = GenAiError;

    fn try_from(wire: WireResponse) -> GenAiResult<Self> {
        let mut parts = Vec::new();
        let content = wire
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content);

        if let Some(content) = content {
            for part in content.parts {
                if let Some(text) = part.text {
                    parts.push(ResponsePart::Text(text));
                } else if let Some(inline) = part.inline_data {
                    let data = BASE64.decode(inline.data.as_bytes()).map_err(|e| {
                        GenAiError::invalid_response(format!("inline data is not base64: {}", e))
                    })?;
                    parts.push(ResponsePart::InlineImage {
                        mime_type: inline.mime_type,
                        data,
                    });
                }
            }
        }

        Ok(ModelResponse { parts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_to_camel_case_wire_shape() {
        let request = GenerateRequest::new("test-model")
            .with_system_instruction("be terse")
            .with_content(Content::user(vec![
                Part::text("prompt"),
                Part::file_ref("s3://bucket/key.jpg", "image/jpeg"),
            ]))
            .with_response_schema(serde_json::json!({"type": "object"}));

        let wire = serde_json::to_value(WireRequest::from(&request)).unwrap();
        assert_eq!(
            wire["systemInstruction"]["parts"][0]["text"],
            "be terse"
        );
        assert_eq!(wire["contents"][0]["role"], "user");
        assert_eq!(wire["contents"][0]["parts"][0]["text"], "prompt");
        assert_eq!(
            wire["contents"][0]["parts"][1]["fileData"]["fileUri"],
            "s3://bucket/key.jpg"
        );
        assert_eq!(
            wire["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_inline_parts_are_base64_encoded() {
        let request = GenerateRequest::new("test-model").with_content(Content::user(vec![
            Part::InlineImage {
                mime_type: "image/jpeg".to_string(),
                data: vec![1, 2, 3],
            },
        ]));

        let wire = serde_json::to_value(WireRequest::from(&request)).unwrap();
        assert_eq!(
            wire["contents"][0]["parts"][0]["inlineData"]["data"],
            BASE64.encode([1u8, 2, 3])
        );
    }

    #[test]
    fn test_response_text_strips_code_fences() {
        let response = ModelResponse::from_text("```json\n[{\"a\":1}]\n```");
        assert_eq!(response.text(), "[{\"a\":1}]");
    }

    #[test]
    fn test_first_inline_image_skips_text_parts() {
        let response = ModelResponse {
            parts: vec![
                ResponsePart::Text("done".to_string()),
                ResponsePart::InlineImage {
                    mime_type: "image/jpeg".to_string(),
                    data: vec![9, 9],
                },
            ],
        };
        assert_eq!(response.first_inline_image(), Some(&[9u8, 9][..]));
    }

    #[test]
    fn test_wire_response_decodes_inline_data() {
        let raw = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "edited"},
                        {"inlineData": {"mimeType": "image/jpeg", "data": BASE64.encode([7u8, 8])}}
                    ]
                }
            }]
        });
        let wire: WireResponse = serde_json::from_value(raw).unwrap();
        let response = ModelResponse::try_from(wire).unwrap();
        assert_eq!(response.text(), "edited");
        assert_eq!(response.first_inline_image(), Some(&[7u8, 8][..]));
    }

    #[test]
    fn test_empty_candidates_decode_to_empty_response() {
        let wire: WireResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        let response = ModelResponse::try_from(wire).unwrap();
        assert!(response.parts.is_empty());
        assert_eq!(response.text(), "");
    }
}
