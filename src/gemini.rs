use std::pin::Pin;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::generation::{single_fragment, FragmentStream, GenerationError, Generator};

// Structures matching Gemini's generateContent / streamGenerateContent endpoints
#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiError {
    code: Option<u16>,
    message: Option<String>,
    status: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, GenerationError> {
        if let Some(err) = self.error {
            return Err(err.into_generation_error());
        }
        // Only the first candidate is used.
        let text = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default();
        Ok(text)
    }
}

impl ApiError {
    fn into_generation_error(self) -> GenerationError {
        let code = self.code.map(|c| c.to_string()).unwrap_or_default();
        let status = self.status.unwrap_or_default();
        let message = self.message.unwrap_or_default();
        GenerationError::classify(format!("{} {}: {}", code, status, message).trim().to_string())
    }
}

/// Google Gemini REST backend.
#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, model: &str, stream: bool) -> String {
        if stream {
            format!("{}/v1beta/models/{}:streamGenerateContent?alt=sse", self.base_url, model)
        } else {
            format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
        }
    }

    async fn send(&self, model: &str, prompt: &str, stream: bool) -> Result<reqwest::Response, GenerationError> {
        let url = self.endpoint(model, stream);
        let payload = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, %url, "Failed to send request to Gemini API");
                GenerationError::classify(e.to_string())
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Gemini API request failed");
            return Err(GenerationError::classify(format!("{}. {}", status, error_body)));
        }

        Ok(response)
    }
}

#[async_trait]
impl Generator for GeminiClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        stream: bool,
    ) -> Result<FragmentStream, GenerationError> {
        debug!(?prompt, "Sending prompt to Gemini");
        let response = self.send(model, prompt, stream).await?;

        if stream {
            return Ok(sse_fragments(response.bytes_stream()));
        }

        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| GenerationError::Generic(format!("Failed to parse JSON response from Gemini API: {}", e)))?;
        let text = parsed.into_text()?;
        debug!(reply_len = text.len(), "Received Gemini response");
        Ok(single_fragment(text))
    }
}

struct SseState<S> {
    body: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Turns a server-sent-events body into reply fragments, one per `data:` line.
/// Lines are reassembled across network chunks before parsing.
fn sse_fragments<S, B>(body: S) -> FragmentStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = SseState { body: Box::pin(body), buffer: Vec::new(), finished: false };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(pos) = state.buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = state.buffer.drain(..=pos).collect();
                match parse_sse_line(&String::from_utf8_lossy(&line)) {
                    Ok(Some(text)) => return Some((Ok(text), state)),
                    Ok(None) => continue,
                    Err(e) => {
                        state.finished = true;
                        state.buffer.clear();
                        return Some((Err(e), state));
                    }
                }
            }

            if state.finished {
                // Trailing line without a newline.
                if state.buffer.is_empty() {
                    return None;
                }
                let line = std::mem::take(&mut state.buffer);
                return match parse_sse_line(&String::from_utf8_lossy(&line)) {
                    Ok(Some(text)) => Some((Ok(text), state)),
                    Ok(None) => None,
                    Err(e) => Some((Err(e), state)),
                };
            }

            match state.body.next().await {
                Some(Ok(chunk)) => state.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => {
                    error!(error = %e, "Gemini stream error");
                    state.finished = true;
                    state.buffer.clear();
                    return Some((Err(GenerationError::classify(e.to_string())), state));
                }
                None => state.finished = true,
            }
        }
    })
    .boxed()
}

/// `Ok(None)` for lines carrying no text (comments, blanks, empty chunks).
fn parse_sse_line(line: &str) -> Result<Option<String>, GenerationError> {
    let line = line.trim();
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    match serde_json::from_str::<GenerateResponse>(data) {
        Ok(chunk) => {
            let text = chunk.into_text()?;
            Ok((!text.is_empty()).then_some(text))
        }
        Err(e) => {
            error!(%data, error = %e, "Failed to parse SSE data line");
            Err(GenerationError::Generic(format!("Failed to parse SSE data line from Gemini API: {}", e)))
        }
    }
}
