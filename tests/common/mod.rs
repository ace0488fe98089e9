#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use interview_coach::{FragmentStream, GenerationError, Generator};

/// Fake backend that plays back canned replies in order and remembers every
/// prompt it was given. Replies are split on spaces to look like a stream.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String, GenerationError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String, GenerationError>>) -> Self {
        Self { replies: Mutex::new(replies.into()), prompts: Mutex::new(Vec::new()) }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _model: &str, prompt: &str, stream: bool) -> Result<FragmentStream, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("Next question, please.".to_string()))?;

        if !stream {
            return Ok(stream::iter(vec![Ok(reply)]).boxed());
        }
        let fragments: Vec<Result<String, GenerationError>> = reply
            .split_inclusive(' ')
            .map(|piece| Ok(piece.to_string()))
            .collect();
        Ok(stream::iter(fragments).boxed())
    }
}

pub fn busy() -> GenerationError {
    GenerationError::classify("503 Service Unavailable. The model is overloaded.")
}
