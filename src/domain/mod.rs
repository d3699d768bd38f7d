pub mod clients;
pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
pub mod strategies;
pub mod value_objects;

pub use clients::*;
pub use entities::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
pub use strategies::*;
pub use value_objects::*;
