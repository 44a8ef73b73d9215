pub mod types;
pub mod vocabulary;
pub mod nova;
pub mod nutrients;
pub mod risk;
pub mod impacts;
pub mod narrative;
pub mod scorer;

pub use types::*;
pub use nova::classify_nova;
pub use scorer::*;
