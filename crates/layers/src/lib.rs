pub mod document;
pub mod labels;
pub mod layer;
pub mod set;
pub mod stream;

pub use document::*;
pub use layer::*;
pub use set::*;
pub use stream::*;
