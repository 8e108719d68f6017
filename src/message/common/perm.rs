//! `PropertyPerm` used by every vector DTO in this tree.
//!
//! Re-exported from [`crate::property`], which is the single canonical
//! definition shared with the object model.
pub use crate::property::PropertyPerm;
