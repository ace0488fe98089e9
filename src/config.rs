use thiserror::Error;

use crate::constants::{self, DEFAULT_MAX_QUESTIONS};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set; add it to the environment or a .env file")]
    MissingApiKey,
    #[error("max questions must be at least 1")]
    NoQuestions,
}

/// Runtime settings for one process. Flags override environment variables,
/// which override the built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_questions: usize,
    pub stream: bool,
}

/// Optional overrides collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_questions: Option<usize>,
    pub no_stream: bool,
}

impl Settings {
    pub fn resolve(overrides: Overrides) -> Result<Self, ConfigError> {
        let api_key = overrides
            .api_key
            .filter(|key| !key.trim().is_empty())
            .or_else(|| constants::GEMINI_API_KEY.clone())
            .ok_or(ConfigError::MissingApiKey)?;

        let max_questions = overrides.max_questions.unwrap_or(DEFAULT_MAX_QUESTIONS);
        if max_questions == 0 {
            return Err(ConfigError::NoQuestions);
        }

        Ok(Self {
            api_key,
            model: overrides.model.unwrap_or_else(|| constants::INTERVIEW_MODEL.clone()),
            base_url: overrides.base_url.unwrap_or_else(|| constants::GEMINI_BASE_URL.clone()),
            max_questions,
            stream: !overrides.no_stream,
        })
    }
}
