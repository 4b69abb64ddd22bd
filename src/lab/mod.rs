//! Variant store and session state
//!
//! A [`Lab`] holds the user info inputs and exactly two [`Variant`]s. It is a
//! plain value: front ends pass it around explicitly and render from it.

mod session;
mod turn;
mod variant;
pub mod view;

pub use session::{
    Lab, UserInfo, DEFAULT_SESSION_MINUTES, MAX_SESSION_MINUTES, MIN_SESSION_MINUTES,
};
pub use turn::{Turn, TurnRole};
pub use variant::{Variant, VariantId, DEFAULT_TEMPLATE_A, DEFAULT_TEMPLATE_B};
