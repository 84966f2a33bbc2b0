//! Model clients used by the analysis pipeline.
//!
//! Two seams: [`TextGenerator`] turns a prompt into text (Gemini), and
//! [`InferenceEndpoint`] sends a JSON payload to a hosted model and returns
//! its raw JSON reply (SageMaker).

/// Gemini `generateContent` client
pub mod gemini;
/// SageMaker runtime client
pub mod sagemaker;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use gemini::GeminiClient;
pub use sagemaker::SageMakerEndpoint;

/// A model that completes a text prompt
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Returns the model's reply to `prompt`
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A hosted model invoked with a JSON payload
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InferenceEndpoint: Send + Sync {
    /// Sends `payload` and returns the decoded JSON reply
    async fn invoke(&self, payload: &Value) -> Result<Value>;
}

/// Pulls the generated text out of the shapes text-generation containers return.
///
/// * a non-empty array: `generated_text` of its first element
/// * an object: `generated_text`, falling back to `outputs`
/// * anything else: the value itself as text
pub fn extract_generated_text(value: &Value) -> String {
    match value {
        Value::Array(items) if !items.is_empty() => items[0]
            .get("generated_text")
            .map(value_as_text)
            .unwrap_or_default(),
        Value::Object(map) => map
            .get("generated_text")
            .or_else(|| map.get("outputs"))
            .map(value_as_text)
            .unwrap_or_default(),
        other => value_as_text(other),
    }
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
