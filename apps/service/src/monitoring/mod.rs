/// Check worker - probes registered checks and alerts owners on state changes
///
/// Each cycle the scheduler lists every check and runs an independent pipeline
/// per check:
/// - re-validate the stored record (`validation`)
/// - send one request and race it against the timeout (`prober`)
/// - classify the outcome and persist it (`outcome`)
/// - alert the owner when the state changed (`alert`)
pub mod alert;
pub mod executor;
pub mod outcome;
pub mod prober;
pub mod scheduler;
pub mod types;
pub mod validation;


pub use executor::CheckExecutor;
pub use prober::{HttpProber, Prober};
pub use scheduler::CheckScheduler;
