pub mod appraiser;
mod code_action;
mod command;
mod context;
mod debouncer;
mod diagnostic;
mod gd;
mod hover;

pub use appraiser::Appraiser;
pub use command::ExecuteCommand;
pub use context::{MavenDocumentEvent, PomPayload};
