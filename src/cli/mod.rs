pub mod args;
pub mod convert;

pub use args::{Cli, Request};
pub use convert::Converter;
