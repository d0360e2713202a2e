//! Short, readable excerpts of error responses
//!
//! The backend reports failures the FastAPI way: `{"detail": "..."}` for
//! service errors and `{"detail": [{"loc": [...], "msg": "..."}]}` for request
//! validation. Only that text is kept; any other field of the body is dropped.

use serde::Deserialize;
use serde_json::Value;

/// Longest excerpt embedded in a transport error, in characters
pub const MAX_EXCERPT_CHARS: usize = 300;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message", alias = "error")]
    detail: Detail,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Issues(Vec<Issue>),
}

#[derive(Deserialize)]
struct Issue {
    msg: String,
    #[serde(default)]
    loc: Vec<Value>,
}

impl Issue {
    fn render(&self) -> String {
        let location: Vec<String> = self
            .loc
            .iter()
            .map(|part| match part {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        if location.is_empty() {
            self.msg.clone()
        } else {
            format!("{}: {}", location.join("."), self.msg)
        }
    }
}

/// Reduce a non-success response body to a one-line excerpt.
///
/// A recognised error document yields its `detail` text. Anything else is
/// collapsed to single spaces. Either way the result is capped at
/// [`MAX_EXCERPT_CHARS`].
pub fn error_excerpt(raw: &str) -> String {
    let text = match serde_json::from_str::<ErrorBody>(raw) {
        Ok(ErrorBody {
            detail: Detail::Text(text),
        }) => text,
        Ok(ErrorBody {
            detail: Detail::Issues(issues),
        }) => issues.iter().map(Issue::render).collect::<Vec<_>>().join("; "),
        Err(_) => raw.to_string(),
    };

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return "<empty response body>".to_string();
    }
    truncate(collapsed)
}

fn truncate(text: String) -> String {
    match text.char_indices().nth(MAX_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}…", &text[..cut]),
        None => text,
    }
}
