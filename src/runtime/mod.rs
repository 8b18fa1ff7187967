//! Submission and lifecycle management of planned applications.
//!
//! The [`RemoteRunner`] consumes the planner's output: it derives one
//! [`JobConfig`] per planned job node and drives the cluster-side
//! [`JobLauncher`] to submit, kill, and poll jobs. The launcher itself is a
//! collaborator supplied by the deployment environment.

use std::str::FromStr;

// Private submodules
mod launcher;
mod runner;

// Public exports
pub use launcher::{ApplicationStatus, JobConfig, JobLauncher, LaunchError};
pub use runner::{RemoteRunner, RunnerError};

/// The operation a command invocation performs on an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Plan the application and submit its jobs.
    Run,
    /// Query the status of the running application.
    Status,
    /// Kill the running application.
    Kill,
}

impl FromStr for Operation {
    type Err = RunnerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "run" => Ok(Operation::Run),
            "status" => Ok(Operation::Status),
            "kill" => Ok(Operation::Kill),
            other => Err(RunnerError::UnrecognizedOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests that the three supported operations parse case-insensitively.
    #[test]
    fn test_operation_parsing() {
        assert_eq!("run".parse::<Operation>().unwrap(), Operation::Run);
        assert_eq!("STATUS".parse::<Operation>().unwrap(), Operation::Status);
        assert_eq!("Kill".parse::<Operation>().unwrap(), Operation::Kill);
    }

    // Tests that an unrecognized operation fails loudly instead of defaulting.
    #[test]
    fn test_unrecognized_operation() {
        match "restart".parse::<Operation>() {
            Err(RunnerError::UnrecognizedOperation(op)) => assert_eq!(op, "restart"),
            other => panic!("expected UnrecognizedOperation, got {:?}", other),
        }
    }
}
