//! JobExecutor Actor - single-flight guard around the whole job lifecycle
//!
//! Idle -> Running -> Idle. The running flag is checked and flipped inside one
//! message handler, so two start requests can never both see Idle. The job
//! itself runs on a spawned task; its end is reported back as a message and
//! the flag is cleared there, whatever the outcome (error or panic included).

use std::{sync::Arc, time::Instant};

use chrono::Utc;
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use tokio::{sync::oneshot, task::JoinHandle};
use tracing::{Level, event};

use crate::{
    actor::{broker::RpcClient, message::ExecutorMessage},
    domain::{
        constant::executor,
        error::BridgeError,
        job::{ExecutorStatus, JobReport, JobStart, JobTicket}
    },
    port::job::{Job, JobContext},
    service::auth::AuthSync
};

/// Everything a job run needs, shared across runs
pub struct ExecutorArgs {
    pub auth: Arc<AuthSync>,
    pub job:  Arc<dyn Job>,
    pub rpc:  RpcClient
}

/// JobExecutor Actor State
pub struct ExecutorState {
    /// Single-flight flag
    is_running:   bool,
    auth:         Arc<AuthSync>,
    job:          Arc<dyn Job>,
    rpc:          RpcClient,
    jobs_started: u64,
    jobs_failed:  u64
}

/// JobExecutor Actor - runs at most one job at a time
pub struct JobExecutor;

#[async_trait::async_trait]
impl Actor for JobExecutor {
    type Arguments = ExecutorArgs;
    type Msg = ExecutorMessage;
    type State = ExecutorState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        ExecutorArgs { auth, job, rpc }: Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = executor::EXECUTOR_STARTED, job = %job.name());

        Ok(ExecutorState { is_running: false, auth, job, rpc, jobs_started: 0, jobs_failed: 0 })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            ExecutorMessage::StartJob { reply } => self.handle_start_job(myself, reply, state),
            ExecutorMessage::JobFinished { report, notify } => self.handle_job_finished(report, notify, state),
            ExecutorMessage::GetStatus { reply } => {
                if let Err(e) = reply.send(Self::status(state)) {
                    event!(Level::ERROR, event = executor::REPLY_DROPPED, error = %e);
                }
            }
        }
        Ok(())
    }
}

impl JobExecutor {
    /// Spawn an idle executor
    pub async fn spawn(
        name: Option<String>,
        args: ExecutorArgs
    ) -> Result<(ActorRef<ExecutorMessage>, JoinHandle<()>), BridgeError> {
        Ok(Actor::spawn(name, JobExecutor, args).await?)
    }

    pub fn status(state: &ExecutorState) -> ExecutorStatus {
        ExecutorStatus {
            is_running:   state.is_running,
            jobs_started: state.jobs_started,
            jobs_failed:  state.jobs_failed
        }
    }

    fn handle_start_job(
        &self,
        myself: ActorRef<ExecutorMessage>,
        reply: RpcReplyPort<JobStart>,
        state: &mut ExecutorState
    ) {
        if state.is_running {
            event!(Level::INFO, event = executor::JOB_REJECTED_BUSY, message = "a job is already running");
            if let Err(e) = reply.send(JobStart::Busy) {
                event!(Level::ERROR, event = executor::JOB_REJECTED_BUSY, error = %e);
            }
            return;
        }

        state.is_running = true;
        state.jobs_started += 1;
        let run_id = state.jobs_started;

        event!(Level::INFO, event = executor::JOB_STARTED, run_id = %run_id, job = %state.job.name());

        let (notify, receiver) = oneshot::channel();
        Self::launch(run_id, state, myself, notify);

        if let Err(e) = reply.send(JobStart::Started(JobTicket::new(run_id, receiver))) {
            // The requester left; the job still runs to completion.
            event!(Level::WARN, event = executor::REPLY_DROPPED, run_id = %run_id, error = %e);
        }
    }

    /// Run auth sync then the job body on a task of its own.
    ///
    /// The body runs inside a nested task so that a panic surfaces as a
    /// `JoinError` here instead of skipping the `JobFinished` report.
    fn launch(
        run_id: u64,
        state: &ExecutorState,
        myself: ActorRef<ExecutorMessage>,
        notify: oneshot::Sender<JobReport>
    ) {
        let auth = state.auth.clone();
        let job = state.job.clone();
        let context = JobContext::new(run_id, state.rpc.clone());

        tokio::spawn(async move {
            let started_at = Instant::now();

            let work = tokio::spawn(async move {
                auth.sync().await?;
                event!(Level::DEBUG, event = executor::JOB_BODY_STARTED, run_id = %run_id);
                job.run(context).await
            });

            let outcome = match work.await {
                Ok(outcome) => outcome,
                Err(e) => Err(BridgeError::Job(format!("job task aborted: {}", e)))
            };

            let report = JobReport { run_id, outcome, elapsed: started_at.elapsed(), finished_at: Utc::now() };
            if let Err(e) = myself.cast(ExecutorMessage::JobFinished { report, notify }) {
                event!(Level::ERROR, event = executor::JOB_REPORT_DROPPED, run_id = %run_id, error = %e);
            }
        });
    }

    fn handle_job_finished(
        &self,
        report: JobReport,
        notify: oneshot::Sender<JobReport>,
        state: &mut ExecutorState
    ) {
        state.is_running = false;

        match &report.outcome {
            Ok(()) => {
                event!(Level::INFO, event = executor::JOB_COMPLETED,
                       run_id = %report.run_id, elapsed_ms = %report.elapsed.as_millis());
            }
            Err(e) => {
                state.jobs_failed += 1;
                event!(Level::ERROR, event = executor::JOB_FAILED,
                       run_id = %report.run_id, elapsed_ms = %report.elapsed.as_millis(), error = %e);
            }
        }

        if notify.send(report).is_err() {
            event!(Level::DEBUG, event = executor::JOB_REPORT_DROPPED, message = "ticket was dropped");
        }
    }
}
