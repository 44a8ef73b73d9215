pub mod types;
pub mod text;
pub mod nutrients;
pub mod serving;
pub mod ingredients;
pub mod claims;
pub mod validation;
pub mod parser;

pub use types::*;
pub use parser::*;
