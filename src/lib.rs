pub mod consent;

pub use consent::*;
