//! Platform collaborators consumed by the core
//!
//! Directory resolution, file primitives, user prompts and the share
//! destination. The command-line front end provides terminal implementations;
//! tests substitute fakes.

pub mod dirs;
pub mod files;
pub mod prompt;
pub mod share;

pub use self::dirs::StorageDirs;
pub use files::{FileOps, LocalFiles};
pub use prompt::{Prompt, ScriptedPrompt, TerminalPrompt};
pub use share::{CopyToDestination, NoShare, ShareOutcome, ShareTarget};
