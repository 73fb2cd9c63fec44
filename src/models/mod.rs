pub mod enums;
pub mod report;
pub mod user;

pub use enums::*;
pub use report::*;
pub use user::*;
