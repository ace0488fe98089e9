// Fixed product data and user-visible text, plus environment-derived defaults.

use std::env;

/// Number of candidate answers collected before the interview closes.
pub const DEFAULT_MAX_QUESTIONS: usize = 5;

/// HTTP sessions idle this long are evicted when new ones are created.
pub const SESSION_IDLE_TIMEOUT_SECS: u64 = 60 * 60;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// Field caps, counted in characters.
pub const MAX_CHARS_NAME: usize = 40;
pub const MAX_CHARS_EXPERIENCE: usize = 200;
pub const MAX_CHARS_SKILLS: usize = 200;
pub const CHAT_INPUT_MAX_CHARS: usize = 1000;

pub const MAIN_TITLE: &str = "☁️ Salesforce Interview Practice";
pub const SECTION_PERSONAL_INFO: &str = "Personal Information";
pub const SECTION_COMPANY_POSITION: &str = "Company and Position";
pub const SECTION_FEEDBACK: &str = "Your Feedback";

pub const LABEL_NAME: &str = "Name";
pub const LABEL_EXPERIENCE: &str = "Experience";
pub const LABEL_SKILLS: &str = "Skills";
pub const LABEL_POSITION: &str = "Choose a Position";
pub const LABEL_COMPANY: &str = "Choose a Company";
pub const PLACEHOLDER_CHAT_INPUT: &str = "Your answer:";

pub const MESSAGE_INTRO: &str = "Please first briefly introduce yourself";
pub const MESSAGE_SETUP_COMPLETE: &str = "Setup complete. Starting interview...";
pub const MESSAGE_FETCHING_FEEDBACK: &str = "Fetching feedback...";
pub const MESSAGE_GENERATING_FEEDBACK: &str = "Generating your feedback...";

pub const INFO_RETRY: &str = "Please try again or restart the interview.";

pub const ERROR_AI_BUSY: &str =
    "🔄 **The AI is temporarily busy.** Please wait a moment and try sending your message again.";
pub const ERROR_AI_FEEDBACK_BUSY: &str =
    "🔄 **The AI service is currently busy.** Please wait a moment and click the button below to try again.";
pub const ERROR_OCCURRED: &str = "❌ **An error occurred:**";
pub const ERROR_GENERIC: &str = "❌ **Error:**";

pub const AVATAR_INTERVIEWER: &str = "☁️";
pub const AVATAR_USER: &str = "🧑‍💼";

lazy_static::lazy_static! {
    pub static ref GEMINI_API_KEY: Option<String> = env::var("GEMINI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty());
    pub static ref INTERVIEW_MODEL: String = env::var("INTERVIEW_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    pub static ref GEMINI_BASE_URL: String = env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string());
}
