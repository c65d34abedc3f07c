mod char_utils;
mod scanner;
mod source;

pub use scanner::{Scanner, Token};
pub use source::{Source, StrSource};
