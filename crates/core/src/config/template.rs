use std::collections::HashMap;

use serde_json::Value as Json;

/// Render `{name}` placeholders in a template against a context map.
///
/// Placeholder names are looked up verbatim, so parameter values stored
/// under `$`-prefixed keys are addressed as `{$name}`. Unresolvable
/// placeholders render as the empty string; an unterminated placeholder is
/// kept literally.
pub fn render(template: &str, context: &HashMap<String, Json>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) => {
                if let Some(value) = context.get(&after[..end]) {
                    out.push_str(&scalar_string(value));
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn scalar_string(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Bool(b) => b.to_string(),
        Json::Number(n) => n.to_string(),
        Json::Null => String::new(),
        other => other.to_string(),
    }
}
