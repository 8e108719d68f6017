pub mod basic;
pub mod message;
pub mod perm;
pub mod state;
pub mod vector;

pub use basic::{DelProperty, GetProperties};
pub use message::{Message, MessageType};
pub use perm::PropertyPerm;
pub use state::PropertyState;
pub use vector::INDIVector;
