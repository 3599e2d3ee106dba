use serde::{Deserialize, Serialize};

/// Author of a thread message, using the service's role strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// The inner payload of a text content block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    pub value: String,
}

/// One content block of a thread message.
///
/// The service tags each block with a modality (`text`, `image_file`,
/// ...). Only text blocks carry anything the relay forwards; the rest
/// are preserved but skipped when extracting text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextValue>,
}

impl ContentBlock {
    pub fn text<S: Into<String>>(value: S) -> Self {
        Self {
            kind: "text".to_string(),
            text: Some(TextValue {
                value: value.into(),
            }),
        }
    }

    /// The text payload, if this is a text block.
    pub fn as_text(&self) -> Option<&str> {
        if self.kind == "text" {
            self.text.as_ref().map(|text| text.value.as_str())
        } else {
            None
        }
    }
}

/// A message stored on a remote thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

impl ThreadMessage {
    pub fn assistant<S: Into<String>>(id: S, text: S) -> Self {
        Self {
            id: id.into(),
            role: Role::Assistant,
            content: vec![ContentBlock::text(text.into())],
        }
    }

    /// Concatenated text across every text content block, in order.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect()
    }
}
