use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

/// The default interval at which a remote job's status is polled.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);

/// The execution mode of an application.
///
/// Batch mode processes a bounded set of input and terminates; stream mode
/// processes unbounded input. The two modes carry different scheduling
/// policies: host affinity is unavailable in batch mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationMode {
    Stream,
    Batch,
}

/// The configuration parameters of a planned Tributary application.
#[derive(Clone)]
pub struct Configuration {
    /// The name under which jobs derived from the plan are submitted.
    pub job_name: String,
    /// The identifier of the job within the application.
    pub job_id: String,
    /// The execution mode of the application.
    pub mode: ApplicationMode,
    /// Whether tasks request placement on the hosts they previously ran on.
    pub host_affinity: bool,
    /// The interval at which a remote job's status is polled.
    pub poll_interval: Duration,
    /// DOT file to export the physical plan.
    pub graph_filename: Option<String>,
    /// The logging level of the logger initialized by Tributary.
    /// If `None`, Tributary will not initialize a logger.
    /// Defaults to [`Level::DEBUG`] when compiling in debug mode,
    /// [`Level::INFO`] when compiling in release mode.
    pub logging_level: Option<Level>,
}

impl Configuration {
    /// Creates a new configuration for the job named `job_name`.
    pub fn new(job_name: &str, job_id: &str) -> Self {
        let log_level = if cfg!(debug_assertions) {
            Some(Level::DEBUG)
        } else {
            Some(Level::INFO)
        };
        Self {
            job_name: job_name.to_string(),
            job_id: job_id.to_string(),
            mode: ApplicationMode::Stream,
            host_affinity: false,
            poll_interval: DEFAULT_POLL_INTERVAL,
            graph_filename: None,
            logging_level: log_level,
        }
    }

    /// Creates a configuration from command line arguments.
    pub fn from_args(app_name: &str, args: &clap::ArgMatches) -> Self {
        let job_name = args.value_of("job-name").unwrap_or(app_name).to_string();
        let job_id = args.value_of("job-id").unwrap_or("1").to_string();
        let mode = if args.is_present("batch") {
            ApplicationMode::Batch
        } else {
            ApplicationMode::Stream
        };
        let host_affinity = args.is_present("host-affinity");
        let graph_filename_arg = args.value_of("graph-filename").unwrap_or("");
        let graph_filename = if graph_filename_arg.is_empty() {
            None
        } else {
            Some(graph_filename_arg.to_string())
        };
        let log_level = match args.occurrences_of("verbose") {
            0 => None,
            1 => Some(Level::WARN),
            2 => Some(Level::INFO),
            3 => Some(Level::DEBUG),
            _ => Some(Level::TRACE),
        };

        Self {
            job_name,
            job_id,
            mode,
            host_affinity,
            poll_interval: DEFAULT_POLL_INTERVAL,
            graph_filename,
            logging_level: log_level,
        }
    }

    /// Runs the application in batch mode.
    pub fn batch_mode(mut self) -> Self {
        self.mode = ApplicationMode::Batch;
        self
    }

    /// Requests placement of tasks on the hosts they previously ran on.
    pub fn with_host_affinity(mut self) -> Self {
        self.host_affinity = true;
        self
    }

    /// Upon planning, exports the physical plan as a
    /// [DOT file](https://en.wikipedia.org/wiki/DOT_(graph_description_language)).
    pub fn export_plan_graph(mut self, filename: &str) -> Self {
        self.graph_filename = Some(filename.to_string());
        self
    }

    /// Sets the interval at which a remote job's status is polled.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the logging level.
    pub fn with_logging_level(mut self, level: Level) -> Self {
        self.logging_level = Some(level);
        self
    }

    /// Tributary will not initialize a logger if this method is called.
    pub fn disable_logger(mut self) -> Self {
        self.logging_level = None;
        self
    }
}
