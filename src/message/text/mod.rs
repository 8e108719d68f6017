pub mod define;
pub mod new;
pub mod one;
pub mod set;

pub use define::{DefText, DefTextVector};
pub use new::NewTextVector;
pub use one::OneText;
pub use set::SetTextVector;
