mod context;
mod message;
mod session;
mod source;
mod stream;

pub use context::*;
pub use message::*;
pub use session::*;
pub use source::*;
pub use stream::*;
