use super::ReportArg;
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_CONTEXT_CHARS: usize = 500;
pub const NO_TRACE: &str = "No stack trace available";
pub const UNKNOWN_COMPONENT: &str = "Unknown Component";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeContext {
    pub text: String,
    pub component: String,
}

impl CodeContext {
    pub fn from_args(args: &[ReportArg]) -> Self {
        let text = extract_context(args);
        let component = extract_component_name(&text);
        Self { text, component }
    }
}

/// First stack trace found among `args`, cut to [`MAX_CONTEXT_CHARS`].
pub fn extract_context(args: &[ReportArg]) -> String {
    args.iter()
        .find_map(ReportArg::stack)
        .map(|stack| stack.chars().take(MAX_CONTEXT_CHARS).collect())
        .unwrap_or_else(|| NO_TRACE.to_string())
}

fn component_patterns() -> &'static [Regex; 2] {
    static COMPILED: OnceLock<[Regex; 2]> = OnceLock::new();
    COMPILED.get_or_init(|| {
        [
            Regex::new(r"at\s+(\w+Component)").expect("component pattern is valid"),
            Regex::new(r"\((.+?\.ts):\d+:\d+\)").expect("file pattern is valid"),
        ]
    })
}

pub fn extract_component_name(context: &str) -> String {
    component_patterns()
        .iter()
        .find_map(|re| re.captures(context))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_COMPONENT.to_string())
}
