pub mod bootstrap;
pub mod cleanup;
pub mod dispatch;
pub mod health;
pub mod integrity;
pub mod optimize;
pub mod repair;
pub mod report_schema;
pub mod run;
pub mod schedule;
pub mod usage;
pub mod validate_schema;

/// How a command finished, mapped to the process exit code in `main`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// Exit 0.
    Passed,
    /// The report carries a failure status. Exit 2.
    Failed,
}

impl Outcome {
    #[must_use]
    pub const fn from_failure(failed: bool) -> Self {
        if failed { Self::Failed } else { Self::Passed }
    }
}
