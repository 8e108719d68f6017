mod define;
mod set;

pub use define::{DefLight, DefLightVector};
pub use set::{OneLight, SetLightVector};
