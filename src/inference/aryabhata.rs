use async_trait::async_trait;
use base64::{ engine::general_purpose::STANDARD as BASE64, Engine as _ };
use log::{ debug, error, warn };
use reqwest::{
    Client as HttpClient,
    header::{ HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE },
};
use std::error::Error as StdError;
use uuid::Uuid;

use super::{ ChatRequest, ChatResponse, GenerationParams, InferenceClient, InferenceError, WireMessage };
use crate::cli::Args;
use crate::models::chat::Role;

/// HTTP client for the aryabhata chat-completion endpoint. One request per
/// turn, no streaming, no retries.
pub struct AryabhataClient {
    http: HttpClient,
    base_url: String,
    model: String,
    params: GenerationParams,
}

impl AryabhataClient {
    pub fn new(
        base_url: String,
        api_key: String,
        client_id: String,
        model: String,
        params: GenerationParams,
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );
        headers.insert(
            "id",
            HeaderValue::from_str(&client_id)
                .map_err(|e| format!("Invalid client id format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            base_url,
            model,
            params,
        })
    }

    pub fn from_args(args: &Args) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let client_id = args.client_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let params = GenerationParams {
            max_tokens: args.max_tokens,
            ..GenerationParams::default()
        };

        Self::new(
            args.base_url.clone(),
            args.api_key.clone(),
            client_id,
            args.model.clone(),
            params,
        )
    }

    fn build_request(&self, query: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![WireMessage {
                role: Role::User.to_string(),
                content: query.to_string(),
            }],
            max_tokens: self.params.max_tokens,
            stream: self.params.stream,
            temperature: self.params.temperature,
            stop: self.params.stop_sequences.clone(),
        }
    }
}

#[async_trait]
impl InferenceClient for AryabhataClient {
    async fn send(
        &self,
        text: &str,
        image: Option<&[u8]>
    ) -> Result<String, InferenceError> {
        let query = text.trim();
        if query.is_empty() && image.is_none() {
            return Err(InferenceError::InvalidInput);
        }

        if let Some(bytes) = image {
            // The endpoint's wire contract has no image field yet, so the
            // upload is encoded but not transmitted. Tracked as a known gap.
            let encoded = BASE64.encode(bytes);
            warn!(
                "image attachment ({} base64 chars) is not part of the wire payload; sending text only",
                encoded.len()
            );
        }

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let req = self.build_request(query);
        debug!("Sending completion request to {} (model: {})", url, self.model);

        let resp = self.http.post(&url).json(&req).send().await?;

        let status = resp.status();
        if !status.is_success() {
            error!("Inference endpoint returned status {}", status);
            return Err(InferenceError::Server { status });
        }

        let body: ChatResponse = resp
            .json()
            .await
            .map_err(|e| {
                if e.is_decode() {
                    InferenceError::MalformedResponse
                } else {
                    InferenceError::Transport(e)
                }
            })?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or(InferenceError::MalformedResponse)
    }
}
