pub mod define;
pub mod new;
pub mod one;
pub mod rule;
pub mod set;
pub mod state;

pub use define::{DefSwitch, DefSwitchVector};
pub use new::NewSwitchVector;
pub use one::OneSwitch;
pub use rule::SwitchRule;
pub use set::SetSwitchVector;
pub use state::SwitchState;
