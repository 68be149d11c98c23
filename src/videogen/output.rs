use serde::Deserialize;
use serde_json::Value;

use crate::error::GenerationError;

/// Guards against pathological nesting like `{"output": {"output": ...}}`
const MAX_NESTING: usize = 4;

/// Shapes a prediction's `output` is known to take
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProviderOutput {
    Single(String),
    Sequence(Vec<Value>),
    Structured { output: Value },
}

impl ProviderOutput {
    pub fn from_value(value: Value) -> Result<Self, GenerationError> {
        let shown = truncate_for_error(&value);
        serde_json::from_value(value).map_err(|_| {
            GenerationError::ProviderContract(format!("unexpected output shape: {shown}"))
        })
    }

    /// Resolves the output to a single non-empty URL. Sequences yield their first
    /// element and structured objects their `output` field.
    pub fn normalize(self) -> Result<String, GenerationError> {
        let mut current = self;
        for _ in 0..MAX_NESTING {
            let next = match current {
                ProviderOutput::Single(url) => {
                    let url = url.trim();
                    if url.is_empty() {
                        return Err(GenerationError::ProviderContract(
                            "output is an empty string".to_string(),
                        ));
                    }
                    return Ok(url.to_string());
                }
                ProviderOutput::Sequence(items) => {
                    items.into_iter().next().ok_or_else(|| {
                        GenerationError::ProviderContract("output list is empty".to_string())
                    })?
                }
                ProviderOutput::Structured { output } => output,
            };
            current = Self::from_value(next)?;
        }

        Err(GenerationError::ProviderContract(
            "output is nested too deeply".to_string(),
        ))
    }
}

pub fn normalize_output(value: Value) -> Result<String, GenerationError> {
    ProviderOutput::from_value(value)?.normalize()
}

fn truncate_for_error(value: &Value) -> String {
    let mut shown = value.to_string();
    if shown.len() > 120 {
        let cut = (0..=120).rev().find(|i| shown.is_char_boundary(*i)).unwrap_or(0);
        shown.truncate(cut);
        shown.push_str("...");
    }
    shown
}
