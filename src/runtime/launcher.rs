use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    configuration::{ApplicationMode, Configuration},
    execution::JobNode,
};

/// The status of an application submitted to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    /// Submitted but not yet running.
    New,
    /// Running on the cluster.
    Running,
    /// Finished and succeeded.
    SuccessfulFinish,
    /// Finished and failed.
    UnsuccessfulFinish,
}

impl ApplicationStatus {
    /// Whether the application has stopped running, successfully or not.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::SuccessfulFinish | ApplicationStatus::UnsuccessfulFinish
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ApplicationStatus::New => write!(f, "New"),
            ApplicationStatus::Running => write!(f, "Running"),
            ApplicationStatus::SuccessfulFinish => write!(f, "SuccessfulFinish"),
            ApplicationStatus::UnsuccessfulFinish => write!(f, "UnsuccessfulFinish"),
        }
    }
}

/// One deployable unit of a planned application.
///
/// Derived from a [`JobNode`] and the application's [`Configuration`]; this
/// is what crosses the boundary to the cluster launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    name: String,
    id: String,
    mode: ApplicationMode,
    host_affinity: bool,
}

impl JobConfig {
    pub(crate) fn from_node(node: &JobNode, config: &Configuration) -> Self {
        Self {
            name: node.name().to_string(),
            id: node.id().to_string(),
            mode: config.mode,
            host_affinity: config.host_affinity,
        }
    }

    /// Builds the job configuration straight from the application's
    /// configuration, without planning. Sufficient while a plan deploys a
    /// single job; killing or querying a job does not require its plan.
    pub(crate) fn from_configuration(config: &Configuration) -> Self {
        Self {
            name: config.job_name.clone(),
            id: config.job_id.clone(),
            mode: config.mode,
            host_affinity: config.host_affinity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> ApplicationMode {
        self.mode
    }

    pub fn host_affinity(&self) -> bool {
        self.host_affinity
    }
}

/// Error raised by a [`JobLauncher`] when a job cannot be submitted, killed,
/// or queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchError(pub String);

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for LaunchError {}

/// Trait for the cluster service that runs jobs on behalf of the planner.
pub trait JobLauncher {
    /// Submits a job for remote execution.
    fn submit(&self, job: &JobConfig) -> Result<(), LaunchError>;

    /// Kills the remote job.
    fn kill(&self, job: &JobConfig) -> Result<(), LaunchError>;

    /// Queries the status of the remote job.
    fn status(&self, job: &JobConfig) -> Result<ApplicationStatus, LaunchError>;
}
