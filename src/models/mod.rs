pub mod catalog;
pub mod contact;
pub mod enums;
pub mod message;
pub mod registration;

pub use catalog::*;
pub use contact::*;
pub use enums::*;
pub use message::*;
pub use registration::*;
