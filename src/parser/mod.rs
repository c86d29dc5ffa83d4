//! Parser module - source scanner and Kconfig parser.

mod grammar;
mod kconfig;
mod scanner;

pub use grammar::*;
pub use kconfig::*;
pub use scanner::*;
