//! Packaging backend adapters
//!
//! - **Helm**: shells out to the `helm` binary (production)
//! - **Mock**: keeps releases in memory, for tests without a cluster

mod helm;
mod mock;

pub use helm::{HELM_BINARY, HelmCli};
pub use mock::{MockBackend, Operation, OperationCounts};
