//! Job lifecycle types for the single-flight executor

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::domain::error::BridgeError;

/// Answer to a job start request
#[derive(Debug)]
pub enum JobStart {
    /// The job was accepted; the ticket resolves when it finishes
    Started(JobTicket),
    /// Another job is still running; nothing was started
    Busy
}

impl JobStart {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStart::Started(_) => "success",
            JobStart::Busy => "busy"
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, JobStart::Busy)
    }

    pub fn into_ticket(self) -> Option<JobTicket> {
        match self {
            JobStart::Started(ticket) => Some(ticket),
            JobStart::Busy => None
        }
    }
}

/// Handle to a running job.
///
/// The executor is back in its idle state before the ticket resolves.
#[derive(Debug)]
pub struct JobTicket {
    run_id:   u64,
    receiver: oneshot::Receiver<JobReport>
}

impl JobTicket {
    pub fn new(run_id: u64, receiver: oneshot::Receiver<JobReport>) -> Self {
        Self { run_id, receiver }
    }

    pub fn run_id(&self) -> u64 {
        self.run_id
    }

    /// Wait for the job to finish
    pub async fn wait(self) -> Result<JobReport, BridgeError> {
        self.receiver.await.map_err(|_| BridgeError::Shutdown)
    }
}

/// Outcome of one job run
#[derive(Debug, Clone)]
pub struct JobReport {
    pub run_id:      u64,
    pub outcome:     Result<(), BridgeError>,
    pub elapsed:     Duration,
    pub finished_at: DateTime<Utc>
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Snapshot of the executor state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStatus {
    pub is_running:   bool,
    pub jobs_started: u64,
    pub jobs_failed:  u64
}
