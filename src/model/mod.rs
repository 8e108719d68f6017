//! In-memory object model for INDI devices, vectors, and members.
//!
//! This is the layer a [`crate::driver::Driver`] actually programs against:
//! wire DTOs in [`crate::message`] are converted into [`Event`]s here and
//! applied to a [`Device`]'s vectors, with invariant enforcement (switch
//! rules, permission checks, partial-update semantics) living on
//! [`Vector::apply_new`] rather than scattered across callers.

mod device;
mod event;
mod member;
mod vector;

pub use device::Device;
pub use event::Event;
pub use member::{Member, MemberValue};
pub use vector::{Vector, VectorKind};
