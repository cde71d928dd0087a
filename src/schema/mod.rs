//! Backend row schema
//!
//! This module defines the row shapes served by the history endpoints and the
//! adapter that turns them into pipeline inputs.

mod adapter;
mod rows;

pub use adapter::*;
pub use rows::*;
