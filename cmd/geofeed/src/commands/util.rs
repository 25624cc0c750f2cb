//! Utility functions for CLI commands.

use std::path::Path;

use anyhow::Context as _;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Loads a YAML or JSON file, chosen by extension.
pub fn load_file<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");

    let result = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&content).with_context(|| format!("parse {path}"))?,
        _ => serde_yaml::from_str(&content).with_context(|| format!("parse {path}"))?,
    };

    Ok(result)
}

/// Prints `result` to stdout as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(result: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(result)?);
    Ok(())
}
