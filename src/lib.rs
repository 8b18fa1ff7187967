//! Tributary is a framework for building distributed stream-processing
//! applications.
//!
//! Applications are declared as logical dataflows: operators read named
//! [streams](crate::execution::StreamSpec), join them against other streams
//! or [tables](crate::application::TableSpec), and write results back out.
//! Before anything runs on a cluster, the
//! [`ExecutionPlanner`](crate::execution::ExecutionPlanner) compiles the
//! logical dataflow into a physical [`JobGraph`](crate::execution::JobGraph):
//! a set of job nodes and classified stream edges with fully resolved
//! partition counts.
//!
//! ## Example
//! This example plans and submits an application which joins a stream of page
//! views against a profile table.
//!
//! ```ignore
//! // Capture arguments for the application.
//! let args = tributary::new_app("page-view-joiner").get_matches();
//! let config = Configuration::from_args("page-view-joiner", &args);
//!
//! // Declare the logical application.
//! let mut app = ApplicationDescriptor::new("page-view-joiner");
//! app.add_input_stream(StreamSpec::new("page-views", "kafka", "PageViewEvent"));
//! app.add_output_stream(StreamSpec::new("decorated-views", "kafka", "DecoratedPageViews"));
//! app.register_stream(StreamSpec::new("profiles", "kafka", "ProfileChangelog"));
//! app.add_table(TableSpec::new("profile-table").with_side_inputs(vec!["profiles"]));
//!
//! app.add_input_operator("read-page-views", "page-views")?;
//! app.add_join_operator(
//!     "join-views-profiles",
//!     JoinKind::StreamTable { table_id: "profile-table".to_string() },
//! );
//! app.add_output_operator("write-decorated-views", "decorated-views")?;
//! app.connect("read-page-views", "join-views-profiles")?;
//! app.connect("join-views-profiles", "write-decorated-views")?;
//!
//! // Plan the application and submit it to the cluster.
//! let mut runner = RemoteRunner::new(config, app, metadata_provider, launcher);
//! runner.run()?;
//! runner.wait_for_finish(Duration::from_secs(0))?;
//! ```
//!
//! ## Planning
//! The planner classifies every declared stream as an input, output, or
//! intermediate of the application, resolves partition counts for externally
//! owned streams with one batched metadata lookup per messaging system, and
//! groups the streams feeding each join operator together. Every join group
//! must agree on a single partition count: joins route identical keys to
//! identical physical tasks, so a mismatch silently corrupts join results at
//! runtime. The planner rejects such plans before anything is deployed.
//!
//! Intermediate streams, produced and consumed within the same application,
//! are not looked up externally. Their partition counts are a planning
//! decision, assigned by a [`PartitionAssigner`](crate::execution::PartitionAssigner)
//! once the join groups are known, so that joined intermediate streams end up
//! co-partitioned with their partners.

// Libraries used in this file.
use clap::{App, Arg};

// Private submodules
mod configuration;

// Public submodules
pub mod application;
pub mod execution;
pub mod runtime;

// Public exports
pub use configuration::{ApplicationMode, Configuration, DEFAULT_POLL_INTERVAL};

/// Defines command line arguments for running a Tributary application.
pub fn new_app(name: &str) -> clap::App {
    App::new(name)
        .arg(
            Arg::with_name("operation")
                .short("o")
                .long("operation")
                .default_value("run")
                .help("The operation to perform; run, status, kill"),
        )
        .arg(
            Arg::with_name("job-name")
                .short("j")
                .long("job-name")
                .takes_value(true)
                .help("Name under which the planned job is submitted"),
        )
        .arg(
            Arg::with_name("job-id")
                .long("job-id")
                .default_value("1")
                .help("Identifier of the planned job"),
        )
        .arg(
            Arg::with_name("batch")
                .short("b")
                .long("batch")
                .takes_value(false)
                .help("Runs the application in batch mode"),
        )
        .arg(
            Arg::with_name("host-affinity")
                .long("host-affinity")
                .takes_value(false)
                .help("Requests placement of tasks on their previous hosts"),
        )
        .arg(
            Arg::with_name("graph-filename")
                .short("g")
                .long("graph-filename")
                .default_value("")
                .help("Exports the physical plan as a DOT file to the provided filename"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .takes_value(false)
                .help("Sets the level of verbosity"),
        )
}
