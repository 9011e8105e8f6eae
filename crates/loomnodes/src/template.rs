use loomcore::Value;

/// Render `{{key}}` placeholders from the input value. `{{input}}` expands
/// to the whole input; any other key is a dot-path into it.
pub(crate) fn render_template(template: &str, input: &Value) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = after[..end].trim();
        let rendered = if key == "input" {
            value_to_text(input)
        } else {
            input
                .get_path(key)
                .map(|v| value_to_text(&v))
                .unwrap_or_default()
        };
        out.push_str(&rendered);
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

pub(crate) fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                n.to_string()
            }
        }
        other => serde_json::to_string(&other.to_json()).unwrap_or_default(),
    }
}
