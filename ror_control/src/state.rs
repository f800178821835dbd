//! State machine module root.
//!
//! The roof has a single motion state machine; park status is tracked
//! alongside it.

pub mod motion;
