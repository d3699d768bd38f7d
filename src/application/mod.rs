pub mod dto;
pub mod use_cases;

pub use dto::*;
pub use use_cases::*;
