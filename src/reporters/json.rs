//! JSON reporter
//!
//! Pretty-printed JSON for piping to jq or other tools.

use anyhow::Result;
use serde::Serialize;

pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
