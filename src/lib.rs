pub mod config;
pub mod console;
pub mod constants;
pub mod gemini;
pub mod generation;
pub mod profile;
pub mod prompts;
pub mod session;
pub mod transcript;
pub mod web_server;

pub use generation::{ErrorKind, FragmentStream, GenerationError, Generator};
pub use profile::{Company, Position, Profile, ProfileBuilder};
pub use session::{InterviewSession, Phase, SessionError, TurnOutcome};
pub use transcript::{Message, Role, Transcript};
