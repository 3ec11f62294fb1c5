//! Conversion of `tools/call` results into tool output.

use serde::Deserialize;
use toolwire_types::ToolOutput;

#[derive(Deserialize)]
struct CallToolResult {
    content: Vec<ContentBlock>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text {
        text: String,
    },
    Image {
        #[serde(default, rename = "mimeType")]
        mime_type: String,
    },
    #[serde(other)]
    Other,
}

impl ContentBlock {
    fn render(&self) -> String {
        match self {
            ContentBlock::Text { text } => text.clone(),
            ContentBlock::Image { mime_type } => format!("[image: {mime_type}]"),
            ContentBlock::Other => "[unsupported content]".to_string(),
        }
    }
}

/// Flatten an MCP content result into text. Results that are not in content
/// form pass through unchanged. `isError: true` yields `Err` with the text.
pub(crate) fn into_output(result: serde_json::Value) -> Result<ToolOutput, String> {
    let Ok(parsed) = CallToolResult::deserialize(&result) else {
        return Ok(ToolOutput::new(result));
    };

    let text = parsed
        .content
        .iter()
        .map(ContentBlock::render)
        .collect::<Vec<_>>()
        .join("\n");

    if parsed.is_error {
        Err(text)
    } else {
        Ok(ToolOutput::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_blocks_are_joined() {
        let out = into_output(json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "text", "text": "line two"}
            ]
        }))
        .unwrap();
        assert_eq!(out.render(), "line one\nline two");
    }

    #[test]
    fn is_error_becomes_err() {
        let err = into_output(json!({
            "content": [{"type": "text", "text": "page not found"}],
            "isError": true
        }))
        .unwrap_err();
        assert_eq!(err, "page not found");
    }

    #[test]
    fn non_text_blocks_get_placeholders() {
        let out = into_output(json!({
            "content": [
                {"type": "image", "data": "AAAA", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "file:///x"}}
            ]
        }))
        .unwrap();
        assert_eq!(out.render(), "[image: image/png]\n[unsupported content]");
    }

    #[test]
    fn plain_values_pass_through() {
        let out = into_output(json!({"total": 3})).unwrap();
        assert_eq!(out.value, json!({"total": 3}));

        let out = into_output(json!(42)).unwrap();
        assert_eq!(out.render(), "42");
    }
}
