pub mod types;
pub mod rules;
pub mod verifier;

pub use types::*;
pub use rules::*;
pub use verifier::*;
