//! Interview state machine.
//!
//! One `InterviewSession` per candidate; nothing is shared between sessions
//! and nothing outlives a restart.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::constants::{
    CHAT_INPUT_MAX_CHARS, DEFAULT_MAX_QUESTIONS, ERROR_AI_BUSY, ERROR_AI_FEEDBACK_BUSY, ERROR_GENERIC,
    ERROR_OCCURRED,
};
use crate::generation::{collect_fragments, GenerationError, Generator};
use crate::profile::Profile;
use crate::prompts::{feedback_prompt, interview_prompt, interview_system_prompt};
use crate::transcript::{Message, Transcript};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Setup,
    Interviewing,
    AwaitingFeedbackRequest,
    FeedbackShown,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("the interview has not been started")]
    NotStarted,
    #[error("the interview has already been started")]
    AlreadyStarted,
    #[error("the interview is complete; request feedback or restart")]
    InterviewComplete,
    #[error("feedback is available once all {max_questions} answers are in")]
    InterviewInProgress { max_questions: usize },
    #[error("feedback has not been requested yet")]
    FeedbackNotRequested,
    #[error("answer is empty")]
    EmptyAnswer,
    #[error("answer must be at most {max} characters (got {actual})")]
    AnswerTooLong { max: usize, actual: usize },
    #[error("interview reply failed: {0}")]
    Reply(GenerationError),
    #[error("feedback generation failed: {0}")]
    Feedback(GenerationError),
}

impl SessionError {
    /// Text to put in front of the candidate.
    pub fn user_message(&self) -> String {
        match self {
            SessionError::Reply(GenerationError::TransientService(_)) => ERROR_AI_BUSY.to_string(),
            SessionError::Reply(err) => format!("{} {}", ERROR_GENERIC, err.message()),
            SessionError::Feedback(GenerationError::TransientService(_)) => ERROR_AI_FEEDBACK_BUSY.to_string(),
            SessionError::Feedback(err) => format!("{} {}", ERROR_OCCURRED, err.message()),
            other => other.to_string(),
        }
    }

    pub fn generation_error(&self) -> Option<&GenerationError> {
        match self {
            SessionError::Reply(err) | SessionError::Feedback(err) => Some(err),
            _ => None,
        }
    }
}

/// What an accepted answer produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "reply", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The interviewer answered.
    Replied(String),
    /// Final answer: kept in the transcript with no reply.
    Recorded,
}

#[derive(Debug, Clone)]
pub struct InterviewSession {
    max_questions: usize,
    profile: Option<Profile>,
    setup_complete: bool,
    turn_count: usize,
    chat_complete: bool,
    feedback_shown: bool,
    transcript: Transcript,
    feedback: Option<String>,
}

impl Default for InterviewSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_QUESTIONS)
    }
}

impl InterviewSession {
    pub fn new(max_questions: usize) -> Self {
        Self {
            max_questions,
            profile: None,
            setup_complete: false,
            turn_count: 0,
            chat_complete: false,
            feedback_shown: false,
            transcript: Transcript::new(),
            feedback: None,
        }
    }

    pub fn phase(&self) -> Phase {
        if !self.setup_complete {
            Phase::Setup
        } else if self.feedback_shown {
            Phase::FeedbackShown
        } else if self.chat_complete {
            Phase::AwaitingFeedbackRequest
        } else {
            Phase::Interviewing
        }
    }

    pub fn max_questions(&self) -> usize {
        self.max_questions
    }

    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    pub fn setup_complete(&self) -> bool {
        self.setup_complete
    }

    pub fn turn_count(&self) -> usize {
        self.turn_count
    }

    pub fn chat_complete(&self) -> bool {
        self.chat_complete
    }

    pub fn feedback_shown(&self) -> bool {
        self.feedback_shown
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Last feedback that came back successfully.
    pub fn feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Locks in the profile and opens the interview.
    #[instrument(skip_all, fields(position = %profile.position(), company = %profile.company()))]
    pub fn start(&mut self, profile: Profile) -> Result<(), SessionError> {
        if self.setup_complete {
            return Err(SessionError::AlreadyStarted);
        }
        self.transcript.push(Message::system(interview_system_prompt(&profile)));
        self.profile = Some(profile);
        self.setup_complete = true;
        self.update_chat_complete();
        info!(max_questions = self.max_questions, "Interview started");
        Ok(())
    }

    /// Records a candidate answer and, unless it is the last one, asks the
    /// model for the interviewer's reply.
    ///
    /// A failed reply leaves the session exactly as it was before the call.
    /// The final answer is stored without a reply; that slot is left for the
    /// feedback request.
    #[instrument(skip(self, generator, answer, on_fragment), fields(turn = self.turn_count))]
    pub async fn submit_answer<G, F>(
        &mut self,
        generator: &G,
        model: &str,
        answer: impl Into<String>,
        stream: bool,
        on_fragment: F,
    ) -> Result<TurnOutcome, SessionError>
    where
        G: Generator + ?Sized,
        F: FnMut(&str),
    {
        if !self.setup_complete {
            return Err(SessionError::NotStarted);
        }
        if self.chat_complete {
            return Err(SessionError::InterviewComplete);
        }

        let answer = answer.into();
        if answer.is_empty() {
            return Err(SessionError::EmptyAnswer);
        }
        let actual = answer.chars().count();
        if actual > CHAT_INPUT_MAX_CHARS {
            return Err(SessionError::AnswerTooLong { max: CHAT_INPUT_MAX_CHARS, actual });
        }

        self.transcript.push(Message::user(answer));

        let outcome = if self.turn_count + 1 < self.max_questions {
            let prompt = interview_prompt(&self.transcript);
            debug!(prompt_len = prompt.len(), "Requesting interviewer reply");
            match generate_text(generator, model, &prompt, stream, on_fragment).await {
                Ok(reply) => {
                    self.transcript.push(Message::assistant(reply.clone()));
                    TurnOutcome::Replied(reply)
                }
                Err(err) => {
                    warn!(kind = ?err.kind(), error = %err, "Interviewer reply failed, rolling back answer");
                    self.transcript.pop_last();
                    return Err(SessionError::Reply(err));
                }
            }
        } else {
            TurnOutcome::Recorded
        };

        self.turn_count += 1;
        self.update_chat_complete();
        if self.chat_complete {
            info!(turns = self.turn_count, "Interview complete, feedback available");
        }
        Ok(outcome)
    }

    /// Marks feedback as shown and generates it from the full transcript.
    #[instrument(skip(self, generator, on_fragment))]
    pub async fn request_feedback<G, F>(
        &mut self,
        generator: &G,
        model: &str,
        stream: bool,
        on_fragment: F,
    ) -> Result<String, SessionError>
    where
        G: Generator + ?Sized,
        F: FnMut(&str),
    {
        if !self.setup_complete {
            return Err(SessionError::NotStarted);
        }
        if !self.chat_complete {
            return Err(SessionError::InterviewInProgress { max_questions: self.max_questions });
        }
        self.feedback_shown = true;
        self.generate_feedback(generator, model, stream, on_fragment).await
    }

    /// Re-issues the same feedback request after a failure.
    #[instrument(skip(self, generator, on_fragment))]
    pub async fn retry_feedback<G, F>(
        &mut self,
        generator: &G,
        model: &str,
        stream: bool,
        on_fragment: F,
    ) -> Result<String, SessionError>
    where
        G: Generator + ?Sized,
        F: FnMut(&str),
    {
        if !self.feedback_shown {
            return Err(SessionError::FeedbackNotRequested);
        }
        self.generate_feedback(generator, model, stream, on_fragment).await
    }

    async fn generate_feedback<G, F>(
        &mut self,
        generator: &G,
        model: &str,
        stream: bool,
        on_fragment: F,
    ) -> Result<String, SessionError>
    where
        G: Generator + ?Sized,
        F: FnMut(&str),
    {
        let prompt = feedback_prompt(&self.transcript);
        match generate_text(generator, model, &prompt, stream, on_fragment).await {
            Ok(feedback) => {
                info!(feedback_len = feedback.len(), "Feedback generated");
                self.feedback = Some(feedback.clone());
                Ok(feedback)
            }
            Err(err) => {
                warn!(kind = ?err.kind(), error = %err, "Feedback generation failed");
                Err(SessionError::Feedback(err))
            }
        }
    }

    /// Back to an empty setup form; nothing carries over.
    pub fn restart(&mut self) {
        info!("Restarting interview session");
        *self = Self::new(self.max_questions);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase(),
            setup_complete: self.setup_complete,
            turn_count: self.turn_count,
            max_questions: self.max_questions,
            chat_complete: self.chat_complete,
            feedback_shown: self.feedback_shown,
            profile: self.profile.clone(),
            messages: self.transcript.visible().cloned().collect(),
            feedback: self.feedback.clone(),
        }
    }

    fn update_chat_complete(&mut self) {
        self.chat_complete = self.turn_count >= self.max_questions;
    }
}

async fn generate_text<G, F>(
    generator: &G,
    model: &str,
    prompt: &str,
    stream: bool,
    on_fragment: F,
) -> Result<String, GenerationError>
where
    G: Generator + ?Sized,
    F: FnMut(&str),
{
    let fragments = generator.generate(model, prompt, stream).await?;
    collect_fragments(fragments, on_fragment).await
}

/// Serializable view of a session, with the system instruction left out.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub setup_complete: bool,
    pub turn_count: usize,
    pub max_questions: usize,
    pub chat_complete: bool,
    pub feedback_shown: bool,
    pub profile: Option<Profile>,
    pub messages: Vec<Message>,
    pub feedback: Option<String>,
}
