//! Top-level facade crate for vitals.
//!
//! Re-exports the metrics core and the collection agent so users can depend on a single crate.

pub mod core {
    pub use vitals_core::*;
}

pub mod agent {
    pub use vitals_agent::*;
}
