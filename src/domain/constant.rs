//! Domain Events - Structured event names for internal monitoring and debugging

/// Bridge (root owner) events
pub mod bridge {
    pub const BRIDGE_STARTED: &str = "bridge.started";
    pub const BRIDGE_SHUTDOWN_STARTED: &str = "bridge.shutdown_started";
    pub const BRIDGE_SHUTDOWN_COMPLETED: &str = "bridge.shutdown_completed";
    pub const RPC_TRIGGER_FAILED: &str = "rpc.trigger_failed";
    pub const RESPONSE_PUMP_STOPPED: &str = "response_pump.stopped";
    pub const HTTP_GET_DEGRADED: &str = "http.get_degraded";
    pub const SESSION_CLEARED: &str = "session.cleared";
    pub const HEALTH_CHECK_COMPLETED: &str = "health.check_completed";
}

/// Broker Actor Events
pub mod broker {
    pub const BROKER_STARTED: &str = "broker.started";
    pub const BROKER_STOPPED: &str = "broker.stopped";
    pub const CALL_QUEUED: &str = "call.queued";
    pub const CALL_DISPATCHED: &str = "call.dispatched";
    pub const CALL_DISPATCH_FAILED: &str = "call.dispatch_failed";
    pub const CALL_COMPLETED: &str = "call.completed";
    pub const CALL_TIMED_OUT: &str = "call.timed_out";
    pub const CALL_ABANDONED: &str = "call.abandoned";
    pub const RESPONSE_UNMATCHED: &str = "response.unmatched";
    pub const DISPATCHER_STOPPED: &str = "dispatcher.stopped";
    pub const REPLY_DROPPED: &str = "broker.reply_dropped";
}

/// JobExecutor Actor Events
pub mod executor {
    pub const EXECUTOR_STARTED: &str = "executor.started";
    pub const JOB_REJECTED_BUSY: &str = "job.rejected_busy";
    pub const JOB_STARTED: &str = "job.started";
    pub const JOB_BODY_STARTED: &str = "job.body_started";
    pub const JOB_COMPLETED: &str = "job.completed";
    pub const JOB_FAILED: &str = "job.failed";
    pub const JOB_REPORT_DROPPED: &str = "job.report_dropped";
    pub const REPLY_DROPPED: &str = "executor.reply_dropped";
}

/// Authentication sync events
pub mod auth {
    pub const SYNC_STARTED: &str = "auth.sync_started";
    pub const CONFIG_PERSISTED: &str = "auth.config_persisted";
    pub const CONFIG_RELOADED: &str = "auth.config_reloaded";
    pub const SYNC_FAILED: &str = "auth.sync_failed";
}

/// Isolated context channel events
pub mod channel {
    pub const CONTEXT_SPAWNED: &str = "context.spawned";
    pub const CONTEXT_EXITED: &str = "context.exited";
    pub const RESPONSE_MALFORMED: &str = "response.malformed";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_drops_have_their_own_event_names() {
        assert_ne!(broker::REPLY_DROPPED, broker::BROKER_STARTED);
        assert_ne!(executor::REPLY_DROPPED, executor::EXECUTOR_STARTED);
        assert_ne!(executor::REPLY_DROPPED, executor::JOB_STARTED);
        assert_ne!(broker::REPLY_DROPPED, executor::REPLY_DROPPED);
    }
}
