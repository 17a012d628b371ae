pub mod document;
pub mod protocol;
pub mod queue;

pub use document::*;
pub use protocol::*;
pub use queue::*;
