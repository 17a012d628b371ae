pub mod event_bus;
pub mod future;
pub mod mount;

pub use event_bus::*;
pub use future::*;
pub use mount::*;
