pub mod field;
pub mod plant;
pub mod user;

pub use field::*;
pub use plant::*;
pub use user::*;
