use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

pub const UNEXPECTED_FORMAT: &str = "AI response received but format is unexpected.";

const ENVELOPE_CONTENT: &str = "/data/rawResponse/choices/0/message/content";
const CHAT_CONTENT: &str = "/choices/0/message/content";
const FIXED_CODE: &str = "/data/fixedCode";
const DIRECT_FIXED_CODE: &str = "/fixedCode";
const SOLUTION: &str = "/solution";

/// Every response shape the fix-it endpoints are known to return.
#[derive(Debug, Clone, PartialEq)]
pub enum FixResponse {
    /// Backend wrapper around a chat completion.
    Envelope { content: String },
    /// Chat completion returned by the provider itself.
    ChatCompletion { content: String },
    FixedCode { code: String },
    Solution { text: String },
    Unrecognized(Value),
}

fn non_empty_str(value: &Value, pointer: &str) -> Option<String> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

impl FixResponse {
    pub fn decode(value: Value) -> Self {
        let probes = (
            non_empty_str(&value, ENVELOPE_CONTENT),
            non_empty_str(&value, CHAT_CONTENT),
            non_empty_str(&value, FIXED_CODE)
                .or_else(|| non_empty_str(&value, DIRECT_FIXED_CODE)),
            non_empty_str(&value, SOLUTION),
        );

        match probes {
            (Some(content), _, _, _) => Self::Envelope { content },
            (None, Some(content), _, _) => Self::ChatCompletion { content },
            (None, None, Some(code), _) => Self::FixedCode { code },
            (None, None, None, Some(text)) => Self::Solution { text },
            (None, None, None, None) => Self::Unrecognized(value),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Envelope { .. } => "envelope",
            Self::ChatCompletion { .. } => "chat_completion",
            Self::FixedCode { .. } => "fixed_code",
            Self::Solution { .. } => "solution",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedFix {
    pub solution: String,
    pub code: String,
}

pub fn normalize(response: &FixResponse) -> NormalizedFix {
    match response {
        FixResponse::Envelope { content } | FixResponse::ChatCompletion { content } => {
            NormalizedFix {
                solution: content.clone(),
                code: extract_code(content),
            }
        }
        FixResponse::FixedCode { code } => NormalizedFix {
            solution: code.clone(),
            code: code.clone(),
        },
        FixResponse::Solution { text } => NormalizedFix {
            solution: text.clone(),
            code: extract_code(text),
        },
        FixResponse::Unrecognized(_) => NormalizedFix {
            solution: UNEXPECTED_FORMAT.to_string(),
            code: String::new(),
        },
    }
}

fn fence_patterns() -> &'static (Regex, Regex) {
    static COMPILED: OnceLock<(Regex, Regex)> = OnceLock::new();
    COMPILED.get_or_init(|| {
        (
            Regex::new(r"```[\s\S]*?```").expect("block pattern is valid"),
            Regex::new(r"```\w*\n?").expect("fence pattern is valid"),
        )
    })
}

/// Body of the first fenced code block in `text`, language tag dropped.
pub fn extract_code(text: &str) -> String {
    let (block, fence) = fence_patterns();
    match block.find(text) {
        Some(found) => fence.replace_all(found.as_str(), "").trim().to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_decode_order() {
        let both = json!({
            "solution": "direct",
            "data": {
                "fixedCode": "let x = 1;",
                "rawResponse": { "choices": [ { "message": { "content": "from envelope" } } ] }
            }
        });
        assert_eq!(
            FixResponse::decode(both),
            FixResponse::Envelope {
                content: "from envelope".into()
            }
        );

        let fixed = json!({ "solution": "direct", "data": { "fixedCode": "let x = 1;" } });
        assert_eq!(FixResponse::decode(fixed).shape(), "fixed_code");

        let nested_first = json!({ "fixedCode": "outer", "data": { "fixedCode": "inner" } });
        assert_eq!(
            FixResponse::decode(nested_first),
            FixResponse::FixedCode {
                code: "inner".into()
            }
        );
    }

    #[test]
    fn test_normalize_known_shapes() {
        let cases = [
            (
                json!({ "success": true, "data": { "rawResponse": { "choices": [
                    { "message": { "content": "Guard the access:\n```ts\nuser?.name\n```" } }
                ] } } }),
                "Guard the access:\n```ts\nuser?.name\n```",
                "user?.name",
            ),
            (
                json!({ "choices": [ { "message": { "content": "Declare userData first." } } ] }),
                "Declare userData first.",
                "",
            ),
            (
                json!({ "success": true, "data": { "fixedCode": "const users = [];" } }),
                "const users = [];",
                "const users = [];",
            ),
            (
                json!({ "fixedCode": "user?.name" }),
                "user?.name",
                "user?.name",
            ),
            (
                json!({ "solution": "Use optional chaining" }),
                "Use optional chaining",
                "",
            ),
        ];

        for (body, solution, code) in cases {
            let fix = normalize(&FixResponse::decode(body));
            assert_eq!(fix.solution, solution);
            assert_eq!(fix.code, code);
        }
    }

    #[test]
    fn test_unknown_shape_falls_back() {
        for body in [
            json!({ "answer": "42" }),
            json!([1, 2, 3]),
            json!(null),
            json!({ "solution": "" }),
            json!({ "choices": [] }),
        ] {
            let fix = normalize(&FixResponse::decode(body));
            assert_eq!(fix.solution, UNEXPECTED_FORMAT);
            assert_eq!(fix.code, "");
        }
    }

    #[test]
    fn test_extract_code_strips_language_tag() {
        let text = "Try this:\n```typescript\nconst name = user?.name;\n```\nand this:\n```\nother\n```";
        assert_eq!(extract_code(text), "const name = user?.name;");
    }

    #[test]
    fn test_extract_code_without_block() {
        assert_eq!(extract_code("No code here, just advice."), "");
        assert_eq!(extract_code(""), "");
        assert_eq!(extract_code("unterminated ```js\nlet x"), "");
    }
}
