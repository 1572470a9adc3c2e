//! `fileflow` - bulk file procedures driven by pluggable strategies.
//!
//! A [`model::Procedure`] names a kind of work (move, delete, clean) and the
//! strategies it runs with. A [`dispatch::Dispatcher`] looks up the handler
//! for its kind, validates it, then runs its pipeline:
//! discover, filter, act, resolve conflicts. Progress is reported to the
//! [`events::Listener`]s registered on the dispatcher.

pub mod cli;
pub mod conflict;
pub mod delete;
pub mod discover;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod events;
pub mod executor;
pub mod exit_codes;
pub mod filter;
pub mod fsops;
pub mod handler;
pub mod model;
pub mod outcome;
pub mod placement;
pub mod reporter;
pub mod resolve;
pub mod validate;

pub use dispatch::Dispatcher;
pub use error::DispatchError;
pub use events::{Listener, ListenerEvent, ListenerHandle, ProgressEvent};
pub use handler::HandlerRegistry;
pub use model::{Procedure, ProcedureKind};
pub use outcome::{FileAction, FileDeletion, Outcome, Summary};
