//! Process-wide logging setup.

pub mod logging;

pub use logging::{LogFormat, init, init_with};
