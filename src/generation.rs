//! The seam between the interview logic and whatever produces text.
//!
//! Streaming and non-streaming backends look the same from here: both hand
//! back a stream of fragments, the non-streaming one just yields once.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Serialize;
use thiserror::Error;

/// Fragments of a reply in arrival order.
pub type FragmentStream = BoxStream<'static, Result<String, GenerationError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientService,
    Generic,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// Backend overloaded or returned 503; worth retrying by hand.
    #[error("generation service busy: {0}")]
    TransientService(String),
    #[error("generation failed: {0}")]
    Generic(String),
}

impl GenerationError {
    /// Sorts a raw backend error message into transient vs. everything else.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        if is_transient(&message) {
            GenerationError::TransientService(message)
        } else {
            GenerationError::Generic(message)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::TransientService(_) => ErrorKind::TransientService,
            GenerationError::Generic(_) => ErrorKind::Generic,
        }
    }

    /// The backend's own error text.
    pub fn message(&self) -> &str {
        match self {
            GenerationError::TransientService(m) | GenerationError::Generic(m) => m,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::TransientService
    }
}

fn is_transient(message: &str) -> bool {
    message.contains("503") || message.to_lowercase().contains("overloaded")
}

/// A text-generation backend.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Starts a generation. Errors may surface either here or from the stream.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        stream: bool,
    ) -> Result<FragmentStream, GenerationError>;
}

/// Wraps a finished reply as a one-element fragment stream.
pub fn single_fragment(text: impl Into<String>) -> FragmentStream {
    stream::once(futures::future::ready(Ok(text.into()))).boxed()
}

/// Drains `fragments` into the final reply, calling `on_fragment` with each
/// piece as it arrives. A failure part way through discards what was read.
pub async fn collect_fragments<F>(
    mut fragments: FragmentStream,
    mut on_fragment: F,
) -> Result<String, GenerationError>
where
    F: FnMut(&str),
{
    let mut full = String::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment?;
        if fragment.is_empty() {
            continue;
        }
        on_fragment(&fragment);
        full.push_str(&fragment);
    }
    Ok(full)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status_code_and_overloaded_text() {
        let cases = vec![
            ("503 Service Unavailable", ErrorKind::TransientService),
            ("The model is overloaded. Please try again later.", ErrorKind::TransientService),
            ("MODEL OVERLOADED", ErrorKind::TransientService),
            ("upstream returned code 503", ErrorKind::TransientService),
            ("400 Bad Request: API key not valid", ErrorKind::Generic),
            ("connection reset by peer", ErrorKind::Generic),
            ("", ErrorKind::Generic),
        ];

        for (message, expected) in cases {
            assert_eq!(GenerationError::classify(message).kind(), expected, "Failed for message: {}", message);
        }
    }

    #[test]
    fn test_message_is_preserved() {
        let err = GenerationError::classify("quota exceeded");
        assert_eq!(err.message(), "quota exceeded");
        assert!(!err.is_transient());
        assert_eq!(err.to_string(), "generation failed: quota exceeded");
    }

    #[tokio::test]
    async fn test_collect_fragments_concatenates_in_order() {
        let fragments = stream::iter(vec![
            Ok("Hello".to_string()),
            Ok(String::new()),
            Ok(", Ana".to_string()),
        ])
        .boxed();

        let mut seen = Vec::new();
        let full = collect_fragments(fragments, |f| seen.push(f.to_string())).await.unwrap();
        assert_eq!(full, "Hello, Ana");
        assert_eq!(seen, vec!["Hello", ", Ana"]);
    }

    #[tokio::test]
    async fn test_collect_fragments_stops_on_error() {
        let fragments = stream::iter(vec![
            Ok("partial".to_string()),
            Err(GenerationError::classify("overloaded")),
            Ok("never".to_string()),
        ])
        .boxed();

        let err = collect_fragments(fragments, |_| {}).await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_single_fragment_yields_once() {
        let full = collect_fragments(single_fragment("whole reply"), |_| {}).await.unwrap();
        assert_eq!(full, "whole reply");
    }
}
