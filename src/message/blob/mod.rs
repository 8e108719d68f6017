mod define;
mod new;
mod one;
mod set;
mod enable;

pub use define::*;
pub use new::*;
pub use one::*;
pub use set::SetBLOBVector;
pub use enable::{EnableBlob, BLOBEnable};
