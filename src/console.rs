// Terminal front end: the setup form, the chat loop and the feedback screen.
//
// Reads are blocking; the process does nothing else while waiting for the
// candidate or the model.

use std::io::{self, BufRead, Write};
use std::str::FromStr;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::config::Settings;
use crate::constants::*;
use crate::generation::Generator;
use crate::profile::{Company, Position, Profile, ProfileBuilder};
use crate::session::{InterviewSession, TurnOutcome};

pub struct Console<'g, R, W, G: ?Sized> {
    input: R,
    output: W,
    generator: &'g G,
    model: String,
    stream: bool,
    max_questions: usize,
}

impl<'g, R, W, G> Console<'g, R, W, G>
where
    R: BufRead,
    W: Write,
    G: Generator + ?Sized,
{
    pub fn new(input: R, output: W, generator: &'g G, settings: &Settings) -> Self {
        Self {
            input,
            output,
            generator,
            model: settings.model.clone(),
            stream: settings.stream,
            max_questions: settings.max_questions,
        }
    }

    /// Runs interviews until the candidate declines a restart or input ends.
    pub async fn run(&mut self) -> Result<()> {
        writeln!(self.output, "{}\n", MAIN_TITLE)?;
        let mut session = InterviewSession::new(self.max_questions);

        loop {
            let Some(profile) = self.collect_profile()? else {
                return Ok(());
            };
            if self.prompt_line("Press Enter to start the interview.")?.is_none() {
                return Ok(());
            }
            session.start(profile).context("Failed to start interview")?;
            writeln!(self.output, "{}\n", MESSAGE_SETUP_COMPLETE)?;

            if !self.interview(&mut session).await? {
                return Ok(());
            }
            if !self.feedback(&mut session).await? {
                return Ok(());
            }

            if !self.ask_yes_no("Restart interview? [y/N]")? {
                info!("Candidate finished practising");
                return Ok(());
            }
            session.restart();
            writeln!(self.output)?;
        }
    }

    fn collect_profile(&mut self) -> Result<Option<Profile>> {
        writeln!(self.output, "== {} ==", SECTION_PERSONAL_INFO)?;
        let Some(name) = self.prompt_text(LABEL_NAME, MAX_CHARS_NAME)? else {
            return Ok(None);
        };
        let Some(experience) = self.prompt_text(LABEL_EXPERIENCE, MAX_CHARS_EXPERIENCE)? else {
            return Ok(None);
        };
        let Some(skills) = self.prompt_text(LABEL_SKILLS, MAX_CHARS_SKILLS)? else {
            return Ok(None);
        };

        writeln!(self.output, "\n== {} ==", SECTION_COMPANY_POSITION)?;
        let Some(position) = self.prompt_choice(LABEL_POSITION, &Position::all())? else {
            return Ok(None);
        };
        let Some(company) = self.prompt_choice(LABEL_COMPANY, &Company::all())? else {
            return Ok(None);
        };

        let profile = ProfileBuilder::new()
            .name(name)
            .experience(experience)
            .skills(skills)
            .position(position)
            .company(company)
            .build()?;
        Ok(Some(profile))
    }

    /// Returns `false` if input ran out before the interview finished.
    async fn interview(&mut self, session: &mut InterviewSession) -> Result<bool> {
        writeln!(self.output, "{} {}", AVATAR_INTERVIEWER, MESSAGE_INTRO)?;

        while !session.chat_complete() {
            let Some(answer) = self.prompt_line(PLACEHOLDER_CHAT_INPUT)? else {
                return Ok(false);
            };
            if answer.is_empty() {
                continue;
            }

            let expects_reply = session.turn_count() + 1 < session.max_questions();
            if expects_reply {
                write!(self.output, "{} ", AVATAR_INTERVIEWER)?;
                self.output.flush()?;
            }

            let generator = self.generator;
            let output = &mut self.output;
            let mut write_error = None;
            let result = session
                .submit_answer(generator, &self.model, answer, self.stream, |fragment| {
                    echo(output, &mut write_error, fragment)
                })
                .await;
            if let Some(e) = write_error {
                return Err(e).context("Failed to write reply");
            }

            match result {
                Ok(TurnOutcome::Replied(_)) => writeln!(self.output, "\n")?,
                Ok(TurnOutcome::Recorded) => debug!("Final answer recorded"),
                Err(err) => {
                    if expects_reply {
                        writeln!(self.output)?;
                    }
                    writeln!(self.output, "{}", err.user_message())?;
                }
            }
        }
        Ok(true)
    }

    /// Returns `false` if input ran out before feedback was shown.
    async fn feedback(&mut self, session: &mut InterviewSession) -> Result<bool> {
        if self.prompt_line("\nInterview complete. Press Enter to get feedback.")?.is_none() {
            return Ok(false);
        }
        writeln!(self.output, "{}", MESSAGE_FETCHING_FEEDBACK)?;
        writeln!(self.output, "\n== {} ==", SECTION_FEEDBACK)?;
        writeln!(self.output, "{}", MESSAGE_GENERATING_FEEDBACK)?;

        let mut first = true;
        loop {
            let generator = self.generator;
            let output = &mut self.output;
            let mut write_error = None;
            let on_fragment = |fragment: &str| echo(output, &mut write_error, fragment);
            let result = if first {
                session.request_feedback(generator, &self.model, self.stream, on_fragment).await
            } else {
                session.retry_feedback(generator, &self.model, self.stream, on_fragment).await
            };
            first = false;
            if let Some(e) = write_error {
                return Err(e).context("Failed to write feedback");
            }

            match result {
                Ok(_) => {
                    writeln!(self.output, "\n")?;
                    return Ok(true);
                }
                Err(err) => {
                    writeln!(self.output, "\n{}", err.user_message())?;
                    let transient = err.generation_error().map(|e| e.is_transient()).unwrap_or(false);
                    if !transient {
                        writeln!(self.output, "{}", INFO_RETRY)?;
                    }
                    if !self.ask_yes_no("Retry feedback? [y/N]")? {
                        return Ok(true);
                    }
                }
            }
        }
    }

    fn prompt_text(&mut self, label: &str, max_chars: usize) -> Result<Option<String>> {
        loop {
            let Some(value) = self.prompt_line(&format!("{}:", label))? else {
                return Ok(None);
            };
            let count = value.chars().count();
            if count <= max_chars {
                return Ok(Some(value));
            }
            writeln!(self.output, "{} must be at most {} characters (got {}).", label, max_chars, count)?;
        }
    }

    /// Numbered menu; blank input takes the first (default) entry.
    fn prompt_choice<T>(&mut self, label: &str, options: &[T]) -> Result<Option<T>>
    where
        T: Copy + ToString + FromStr,
    {
        for (i, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}. {}", i + 1, option.to_string())?;
        }
        loop {
            let Some(choice) = self.prompt_line(&format!("{} [1-{}]:", label, options.len()))? else {
                return Ok(None);
            };
            let choice = choice.trim();
            if choice.is_empty() {
                return Ok(options.first().copied());
            }
            if let Ok(index) = choice.parse::<usize>() {
                if (1..=options.len()).contains(&index) {
                    return Ok(Some(options[index - 1]));
                }
            } else if let Ok(value) = T::from_str(choice) {
                return Ok(Some(value));
            }
            writeln!(self.output, "Please pick a number between 1 and {}.", options.len())?;
        }
    }

    fn ask_yes_no(&mut self, question: &str) -> Result<bool> {
        let answer = self.prompt_line(question)?;
        Ok(matches!(answer.as_deref().map(str::trim), Some("y") | Some("Y") | Some("yes")))
    }

    /// `None` on end of input.
    fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>> {
        write!(self.output, "{} ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line).context("Failed to read from input")? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

/// Writes one fragment. The first failure is kept in `slot` and later
/// fragments are skipped.
fn echo<W: Write>(output: &mut W, slot: &mut Option<io::Error>, fragment: &str) {
    if slot.is_some() {
        return;
    }
    if let Err(e) = write!(output, "{}", fragment).and_then(|_| output.flush()) {
        *slot = Some(e);
    }
}
