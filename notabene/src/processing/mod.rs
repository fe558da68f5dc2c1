mod chunker;
mod fingerprint;

pub use chunker::*;
pub use fingerprint::*;
