//! Account module: resolving credentials for one account.
//!
//! This module provides:
//! - `Schema` and `FieldDescriptor`, what an account holds (`schema`)
//! - The `Prompter` trait and its terminal, line and scripted sources (`prompt`)
//! - `AccountSession`, the load-or-collect state machine (`session`)

pub mod prompt;
pub mod schema;
pub mod session;

pub use prompt::{LinePrompter, Prompter, ScriptedPrompter, TerminalPrompter};
pub use schema::{FieldDescriptor, FieldKind, Schema};
pub use session::{AccountSession, Origin, SessionOptions};
