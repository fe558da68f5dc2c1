mod collection;

pub use collection::*;
