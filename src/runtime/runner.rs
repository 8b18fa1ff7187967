use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::{
    application::ApplicationDescriptor,
    configuration::Configuration,
    execution::{ExecutionPlanner, PlanningError, StreamMetadataProvider},
};

use super::launcher::{ApplicationStatus, JobConfig, JobLauncher, LaunchError};

/// Error raised while running, killing, or querying an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// Planning the application failed.
    Planning(PlanningError),
    /// The cluster launcher reported a failure.
    Launch(LaunchError),
    /// Job preparation yielded no deployable jobs.
    NoJobs,
    /// The requested operation is not recognized.
    UnrecognizedOperation(String),
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RunnerError::Planning(e) => write!(f, "Failed to plan application: {}", e),
            RunnerError::Launch(e) => write!(f, "{}", e),
            RunnerError::NoJobs => write!(f, "No jobs to run"),
            RunnerError::UnrecognizedOperation(op) => {
                write!(f, "Unrecognized operation: {}", op)
            }
        }
    }
}

impl std::error::Error for RunnerError {}

impl From<PlanningError> for RunnerError {
    fn from(e: PlanningError) -> Self {
        RunnerError::Planning(e)
    }
}

impl From<LaunchError> for RunnerError {
    fn from(e: LaunchError) -> Self {
        RunnerError::Launch(e)
    }
}

/// Runs applications on a remote cluster.
///
/// The runner plans the application, derives one [`JobConfig`] per planned
/// job node, and submits them through its [`JobLauncher`]. Killing or
/// querying a running application does not replan it.
pub struct RemoteRunner<M: StreamMetadataProvider> {
    config: Configuration,
    descriptor: ApplicationDescriptor,
    planner: ExecutionPlanner<M>,
    launcher: Box<dyn JobLauncher>,
    // Flushes buffered logs when dropped.
    _logger_guard: Option<WorkerGuard>,
}

impl<M: StreamMetadataProvider> RemoteRunner<M> {
    /// Creates a runner for `descriptor` under `config`.
    pub fn new(
        config: Configuration,
        descriptor: ApplicationDescriptor,
        metadata_provider: M,
        launcher: Box<dyn JobLauncher>,
    ) -> Self {
        // Set up the logger.
        let logger_guard = if let Some(logging_level) = config.logging_level {
            let display_thread_ids = logging_level >= Level::TRACE;
            let display_target = logging_level >= Level::TRACE;

            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
            let subscriber = tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_thread_ids(display_thread_ids)
                .with_span_events(FmtSpan::FULL)
                .with_target(display_target)
                .with_max_level(logging_level);
            subscriber.init();

            Some(guard)
        } else {
            None
        };

        let planner = ExecutionPlanner::new(config.clone(), metadata_provider);
        Self {
            config,
            descriptor,
            planner,
            launcher,
            _logger_guard: logger_guard,
        }
    }

    /// Plans the application and derives its deployable job configurations.
    pub fn prepare_jobs(&self) -> Result<Vec<JobConfig>, RunnerError> {
        let graph = self.planner.plan(&self.descriptor)?;
        let mut jobs: Vec<JobConfig> = graph
            .nodes()
            .map(|node| JobConfig::from_node(node, &self.config))
            .collect();
        jobs.sort_by(|a, b| a.id().cmp(b.id()));
        Ok(jobs)
    }

    /// Plans the application and submits every derived job.
    pub fn run(&self) -> Result<(), RunnerError> {
        let jobs = self.prepare_jobs()?;
        if jobs.is_empty() {
            return Err(RunnerError::NoJobs);
        }

        for job in jobs.iter() {
            tracing::info!("Starting job {} (id {})", job.name(), job.id());
            self.launcher.submit(job)?;
        }
        Ok(())
    }

    /// Kills the remote application.
    pub fn kill(&self) -> Result<(), RunnerError> {
        let job = JobConfig::from_configuration(&self.config);
        tracing::info!("Killing job {}", job.name());
        self.launcher.kill(&job)?;
        Ok(())
    }

    /// Queries the status of the remote application.
    pub fn status(&self) -> Result<ApplicationStatus, RunnerError> {
        let job = JobConfig::from_configuration(&self.config);
        let status = self.launcher.status(&job)?;
        tracing::debug!("Status is {} for job {}", status, job.name());
        Ok(status)
    }

    /// Waits for the remote application to reach a terminal status.
    ///
    /// Polls the launcher at the configured interval until the application
    /// finishes or `timeout` elapses; a zero `timeout` polls forever. Returns
    /// whether the application finished.
    pub fn wait_for_finish(&self, timeout: Duration) -> Result<bool, RunnerError> {
        let poll_forever = timeout == Duration::from_millis(0);
        let sleep_duration = if poll_forever {
            self.config.poll_interval
        } else {
            self.config.poll_interval.min(timeout)
        };
        let start = Instant::now();

        loop {
            let status = self.status()?;
            if status.is_terminal() {
                tracing::info!("Application finished with status {}", status);
                return Ok(true);
            }

            if !poll_forever && start.elapsed() >= timeout {
                tracing::warn!("Timed out waiting for the application to finish.");
                return Ok(false);
            }
            thread::sleep(sleep_duration);
        }
    }
}
