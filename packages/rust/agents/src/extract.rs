//! Tolerant JSON extraction from model output.
//!
//! Collaborator responses are free text that should contain a JSON value.
//! Models wrap JSON in prose or code fences often enough that strict
//! parsing alone is not viable: we locate the outermost bracketed block,
//! repair trailing commas, and only then parse.

use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

use listscout_shared::{ListScoutError, Result};

/// `, ]` and `, }` — invalid JSON that models emit regularly.
fn trailing_comma_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r",\s*([\]}])").expect("static regex"))
}

/// Extract and parse a JSON array from free text.
pub fn json_array<T: DeserializeOwned>(text: &str) -> Result<T> {
    parse_block(text, '[', ']')
}

/// Extract and parse a JSON object from free text.
pub fn json_object<T: DeserializeOwned>(text: &str) -> Result<T> {
    parse_block(text, '{', '}')
}

fn parse_block<T: DeserializeOwned>(text: &str, open: char, close: char) -> Result<T> {
    let start = text.find(open).ok_or_else(|| {
        ListScoutError::Agent(format!("no '{open}…{close}' block in response"))
    })?;
    let end = text.rfind(close).ok_or_else(|| {
        ListScoutError::Agent(format!("unterminated '{open}…{close}' block in response"))
    })?;
    if end < start {
        return Err(ListScoutError::Agent(format!(
            "malformed '{open}…{close}' block in response"
        )));
    }

    let block = &text[start..=end];
    let repaired = trailing_comma_re().replace_all(block, "$1");

    serde_json::from_str(&repaired)
        .map_err(|e| ListScoutError::Agent(format!("response JSON did not parse: {e}")))
}
