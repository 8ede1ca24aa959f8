mod command;
mod conflict;
mod uri;

pub use command::*;
pub use conflict::*;
pub use uri::*;
