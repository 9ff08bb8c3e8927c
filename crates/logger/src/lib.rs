//! Process-wide tracing setup shared by the workspace binaries.

mod tracing;

pub use self::tracing::{LogFormat, init};
