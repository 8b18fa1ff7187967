use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use tributary::execution::{
    IntermediateStreamManager, JobGraph, MetadataError, PartitionAssigner, PlanningError,
    StreamMetadataProvider, StreamSet,
};
use tributary::runtime::{ApplicationStatus, JobConfig, JobLauncher, LaunchError};
use tributary::Configuration;

/// A configuration suitable for tests: no global logger, fast polling.
pub fn test_config(job_name: &str) -> Configuration {
    Configuration::new(job_name, "1")
        .disable_logger()
        .with_poll_interval(std::time::Duration::from_millis(1))
}

/// A metadata provider answering from a fixed table and recording every
/// batched lookup it serves.
pub struct MockMetadataProvider {
    counts: HashMap<String, HashMap<String, usize>>,
    calls: Arc<Mutex<Vec<(String, BTreeSet<String>)>>>,
}

impl MockMetadataProvider {
    pub fn new() -> Self {
        Self {
            counts: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_stream(mut self, system: &str, stream: &str, partitions: usize) -> Self {
        self.counts
            .entry(system.to_string())
            .or_insert_with(HashMap::new)
            .insert(stream.to_string(), partitions);
        self
    }

    /// A handle to the recorded lookups, usable after the provider is moved
    /// into a planner.
    pub fn calls(&self) -> Arc<Mutex<Vec<(String, BTreeSet<String>)>>> {
        self.calls.clone()
    }
}

impl StreamMetadataProvider for MockMetadataProvider {
    fn partition_counts(
        &self,
        system: &str,
        streams: &BTreeSet<String>,
    ) -> Result<HashMap<String, usize>, MetadataError> {
        self.calls
            .lock()
            .unwrap()
            .push((system.to_string(), streams.clone()));

        let known = self
            .counts
            .get(system)
            .ok_or_else(|| MetadataError(format!("Unknown system {}", system)))?;
        streams
            .iter()
            .map(|stream| {
                known
                    .get(stream)
                    .map(|partitions| (stream.clone(), *partitions))
                    .ok_or_else(|| MetadataError(format!("Unknown stream {}", stream)))
            })
            .collect()
    }
}

/// A launcher recording submissions and kills, and answering status queries
/// from a scripted sequence (the last status repeats).
pub struct MockLauncher {
    pub submitted: Arc<Mutex<Vec<JobConfig>>>,
    pub killed: Arc<Mutex<Vec<JobConfig>>>,
    statuses: Arc<Mutex<VecDeque<ApplicationStatus>>>,
    fail_submissions: bool,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self {
            submitted: Arc::new(Mutex::new(Vec::new())),
            killed: Arc::new(Mutex::new(Vec::new())),
            statuses: Arc::new(Mutex::new(VecDeque::new())),
            fail_submissions: false,
        }
    }

    pub fn with_statuses(self, statuses: Vec<ApplicationStatus>) -> Self {
        *self.statuses.lock().unwrap() = statuses.into_iter().collect();
        self
    }

    pub fn failing_submissions(mut self) -> Self {
        self.fail_submissions = true;
        self
    }
}

impl JobLauncher for MockLauncher {
    fn submit(&self, job: &JobConfig) -> Result<(), LaunchError> {
        if self.fail_submissions {
            return Err(LaunchError(format!("Unable to submit job {}", job.name())));
        }
        self.submitted.lock().unwrap().push(job.clone());
        Ok(())
    }

    fn kill(&self, job: &JobConfig) -> Result<(), LaunchError> {
        self.killed.lock().unwrap().push(job.clone());
        Ok(())
    }

    fn status(&self, _job: &JobConfig) -> Result<ApplicationStatus, LaunchError> {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap())
        } else {
            statuses
                .front()
                .copied()
                .ok_or_else(|| LaunchError("No status scripted".to_string()))
        }
    }
}

/// A partition assigner which records whether it was invoked before
/// delegating to the default policy.
pub struct FlaggingAssigner {
    invoked: Arc<Mutex<bool>>,
    inner: IntermediateStreamManager,
}

impl FlaggingAssigner {
    pub fn new() -> Self {
        Self {
            invoked: Arc::new(Mutex::new(false)),
            inner: IntermediateStreamManager::new(),
        }
    }

    pub fn invocations(&self) -> Arc<Mutex<bool>> {
        self.invoked.clone()
    }
}

impl PartitionAssigner for FlaggingAssigner {
    fn assign_partitions(
        &self,
        graph: &mut JobGraph,
        join_groups: &[StreamSet],
    ) -> Result<(), PlanningError> {
        *self.invoked.lock().unwrap() = true;
        self.inner.assign_partitions(graph, join_groups)
    }
}
