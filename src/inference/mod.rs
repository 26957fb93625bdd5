pub mod aryabhata;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{ Deserialize, Serialize };
use thiserror::Error;

pub use self::aryabhata::AryabhataClient;

#[derive(Debug, Error)]
pub enum InferenceError {
    /// Neither a query nor an image was supplied. Raised before any
    /// network activity.
    #[error("either a query or an image must be provided")]
    InvalidInput,
    #[error("request to inference endpoint failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("inference endpoint returned status {status}")]
    Server { status: StatusCode },
    #[error("inference endpoint response is missing the reply content")]
    MalformedResponse,
}

/// Fixed decoding options sent with every completion request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub stop_sequences: Vec<String>,
    pub stream: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.0,
            stop_sequences: [
                "<|im_end|>",
                "<|end|>",
                "<im_start|>",
                "```python\n",
                "<|im_start|>",
                "]}}]}}]",
                " <im_start>",
            ]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            stream: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    pub max_tokens: u32,
    pub stream: bool,
    pub temperature: f32,
    pub stop: Vec<String>,
}

#[derive(Deserialize, Debug)]
pub struct ChatResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
pub struct ChatChoice {
    pub message: WireMessage,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Sends one user turn and resolves to the reply text. `text` must be
    /// non-empty after trimming unless an image is attached.
    async fn send(
        &self,
        text: &str,
        image: Option<&[u8]>
    ) -> Result<String, InferenceError>;
}
