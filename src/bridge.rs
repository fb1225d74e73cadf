//! Bridge - root owner of the broker and the job executor
//!
//! The Bridge is the control surface the host talks to:
//! - Spawns the Broker and JobExecutor actors and stops them on shutdown
//! - Starts single-flight jobs and dispatches individual calls
//! - Accepts responses coming back from the isolated context
//! - Runs best-effort authenticated HTTP GETs and session clearing
//! - Reports the resolved configuration file layout

use std::{collections::HashMap, sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use ractor::{
    ActorRef,
    rpc::{CallResult, call}
};
use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Level, event};
use uuid::Uuid;

use crate::{
    AppContext,
    actor::{
        broker::{Broker, RpcClient},
        executor::{ExecutorArgs, JobExecutor},
        message::{BridgeHealth, ExecutorMessage}
    },
    domain::{
        constant::bridge,
        error::BridgeError,
        job::{ExecutorStatus, JobStart},
        rpc::{CallId, RpcResponse}
    },
    port::{channel::ContextChannel, http::HttpClient, job::Job},
    service::{auth::AuthSync, config::PathLayout}
};

pub struct Bridge {
    rpc:        RpcClient,
    executor:   ActorRef<ExecutorMessage>,
    auth:       Arc<AuthSync>,
    http:       Arc<dyn HttpClient>,
    paths:      PathLayout,
    handles:    Vec<JoinHandle<()>>,
    started_at: Instant,
    started_on: DateTime<Utc>
}

impl Bridge {
    /// Spawn the actor system around one isolated context and one job body
    pub async fn spawn(
        context: AppContext,
        channel: Arc<dyn ContextChannel>,
        job: Arc<dyn Job>
    ) -> Result<Self, BridgeError> {
        let instance = Uuid::new_v4().simple().to_string();
        let paths = context.config.path_layout();
        let auth = Arc::new(AuthSync::new(context.session.clone(), context.config_store.clone()));

        let (broker_ref, broker_handle) =
            Broker::spawn(Some(format!("broker_{}", instance)), channel, context.config.broker).await?;
        let rpc = RpcClient::new(broker_ref);

        let args = ExecutorArgs { auth: auth.clone(), job, rpc: rpc.clone() };
        let (executor, executor_handle) = match JobExecutor::spawn(Some(format!("executor_{}", instance)), args).await {
            Ok(spawned) => spawned,
            Err(e) => {
                rpc.actor().stop(None);
                return Err(e);
            }
        };

        event!(Level::INFO, event = bridge::BRIDGE_STARTED, instance = %instance);

        Ok(Self {
            rpc,
            executor,
            auth,
            http: context.http,
            paths,
            handles: vec![broker_handle, executor_handle],
            started_at: Instant::now(),
            started_on: Utc::now()
        })
    }

    /// Caller-side handle for dispatching calls
    pub fn rpc_client(&self) -> RpcClient {
        self.rpc.clone()
    }

    /// Start the job unless one is already running
    pub async fn request_job_start(&self) -> Result<JobStart, BridgeError> {
        match call(&self.executor, |reply| ExecutorMessage::StartJob { reply }, None).await {
            Ok(CallResult::Success(start)) => Ok(start),
            Ok(_) => Err(BridgeError::Shutdown),
            Err(e) => Err(BridgeError::from(e))
        }
    }

    /// Dispatch one call and wait for its value
    pub async fn invoke(&self, method: impl Into<String>, args: Vec<Value>) -> Result<Value, BridgeError> {
        self.rpc.invoke(method, args).await
    }

    /// Dispatch one call; any failure yields `null`
    pub async fn request_rpc_trigger(&self, method: impl Into<String>, args: Vec<Value>) -> Value {
        let method = method.into();
        match self.rpc.invoke(method.clone(), args).await {
            Ok(value) => value,
            Err(e) => {
                event!(Level::WARN, event = bridge::RPC_TRIGGER_FAILED, method = %method, error = %e);
                Value::Null
            }
        }
    }

    /// Inbound entry point for the isolated context. Always acknowledges
    /// unless the broker is gone; unknown ids are dropped by the broker.
    pub fn deliver_rpc_response(&self, id: CallId, value: Value) -> bool {
        self.rpc.deliver(RpcResponse { id, value }).is_ok()
    }

    /// Forward a stream of responses (e.g. a child process's stdout) to the broker
    pub fn pump_responses(&self, mut responses: mpsc::UnboundedReceiver<RpcResponse>) -> JoinHandle<()> {
        let rpc = self.rpc.clone();
        tokio::spawn(async move {
            while let Some(response) = responses.recv().await {
                if let Err(e) = rpc.deliver(response) {
                    event!(Level::WARN, event = bridge::RESPONSE_PUMP_STOPPED, error = %e);
                    return;
                }
            }
            event!(Level::DEBUG, event = bridge::RESPONSE_PUMP_STOPPED, message = "response stream closed");
        })
    }

    /// Authenticated GET; failures degrade to an empty JSON object
    pub async fn http_get(&self, url: &str, params: &HashMap<String, String>) -> Value {
        let result = match self.auth.sync().await {
            Ok(_) => self.http.get(url, params).await,
            Err(e) => Err(e)
        };

        result.unwrap_or_else(|e| {
            event!(Level::WARN, event = bridge::HTTP_GET_DEGRADED, url = %url, error = %e);
            Value::Object(Default::default())
        })
    }

    /// Drop every stored session credential
    pub async fn clear_session_storage(&self) -> Result<bool, BridgeError> {
        self.auth.session().clear().await?;
        event!(Level::INFO, event = bridge::SESSION_CLEARED);
        Ok(true)
    }

    /// Configuration, session and directory paths as a JSON object
    pub fn path_config(&self) -> Result<Value, BridgeError> {
        Ok(serde_json::to_value(&self.paths)?)
    }

    pub async fn executor_status(&self) -> Result<ExecutorStatus, BridgeError> {
        match call(&self.executor, |reply| ExecutorMessage::GetStatus { reply }, None).await {
            Ok(CallResult::Success(status)) => Ok(status),
            Ok(_) => Err(BridgeError::Shutdown),
            Err(e) => Err(BridgeError::from(e))
        }
    }

    pub async fn health(&self) -> Result<BridgeHealth, BridgeError> {
        let pending_calls = self.rpc.pending_calls().await?;
        let status = self.executor_status().await?;

        let health = BridgeHealth {
            pending_calls,
            job_running: status.is_running,
            jobs_started: status.jobs_started,
            jobs_failed: status.jobs_failed,
            started_at: self.started_on,
            uptime_seconds: self.started_at.elapsed().as_secs()
        };

        event!(Level::DEBUG, event = bridge::HEALTH_CHECK_COMPLETED,
               pending_calls = %health.pending_calls, job_running = %health.job_running);
        Ok(health)
    }

    /// Stop both actors. Calls still pending fail with `Shutdown`.
    pub async fn shutdown(self) -> Result<(), BridgeError> {
        event!(Level::DEBUG, event = bridge::BRIDGE_SHUTDOWN_STARTED);

        self.executor.stop(None);
        self.rpc.actor().stop(None);

        for handle in self.handles {
            handle.await.map_err(|e| BridgeError::Generic(format!("actor did not stop cleanly: {}", e)))?;
        }

        event!(Level::INFO, event = bridge::BRIDGE_SHUTDOWN_COMPLETED);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration
    };

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::{Mutex, Notify};

    use super::*;
    use crate::{
        adapter::{channel::InMemoryChannel, config::InMemoryConfigStore, session::InMemorySessionStore},
        domain::{rpc::RpcRequest, session::Credential},
        port::{config::ConfigStore, job::JobContext},
        service::{
            config::{AppConfig, BrokerSettings},
            plan::{CallPlan, PlanJob}
        }
    };

    /// Job that signals when its body starts and waits to be released
    struct GatedJob {
        started: Arc<Notify>,
        release: Arc<Notify>
    }

    #[async_trait]
    impl Job for GatedJob {
        async fn run(&self, _context: JobContext) -> Result<(), BridgeError> {
            self.started.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    struct FailingJob {
        runs: AtomicUsize
    }

    #[async_trait]
    impl Job for FailingJob {
        async fn run(&self, _context: JobContext) -> Result<(), BridgeError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Err(BridgeError::Job("download failed".to_string()))
        }
    }

    struct PanickingJob;

    #[async_trait]
    impl Job for PanickingJob {
        async fn run(&self, _context: JobContext) -> Result<(), BridgeError> {
            panic!("job body blew up");
        }
    }

    /// HTTP stub that records the cookie the config store holds at call time
    struct RecordingHttp {
        config: Arc<dyn ConfigStore>,
        seen:   Mutex<Vec<String>>,
        fail:   bool
    }

    #[async_trait]
    impl HttpClient for RecordingHttp {
        async fn get(&self, url: &str, _params: &HashMap<String, String>) -> Result<Value, BridgeError> {
            self.seen.lock().await.push(self.config.current().await.request.cookie);
            if self.fail {
                return Err(BridgeError::Network(format!("GET {} failed with status: 403", url)));
            }
            Ok(json!({ "url": url }))
        }
    }

    struct Harness {
        bridge:   Bridge,
        requests: mpsc::UnboundedReceiver<RpcRequest>,
        session:  Arc<InMemorySessionStore>,
        config:   Arc<InMemoryConfigStore>,
        http:     Arc<RecordingHttp>
    }

    async fn harness_with(job: Arc<dyn Job>, settings: BrokerSettings, http_fails: bool) -> Harness {
        let session = Arc::new(InMemorySessionStore::with_credentials(vec![
            Credential::new("a", "1"),
            Credential::new("b", "2"),
        ]));
        let config = Arc::new(InMemoryConfigStore::new());
        let http = Arc::new(RecordingHttp { config: config.clone(), seen: Mutex::new(Vec::new()), fail: http_fails });

        let context = AppContext::new(
            AppConfig::in_dir(std::env::temp_dir().join("sigbridge-tests")).with_broker(settings),
            session.clone(),
            config.clone(),
            http.clone()
        );
        let (channel, requests) = InMemoryChannel::new();
        let bridge = Bridge::spawn(context, Arc::new(channel), job).await.unwrap();

        Harness { bridge, requests, session, config, http }
    }

    async fn harness(job: Arc<dyn Job>) -> Harness {
        harness_with(job, BrokerSettings::default(), false).await
    }

    fn idle_job() -> Arc<dyn Job> {
        Arc::new(FailingJob { runs: AtomicUsize::new(0) })
    }

    /// Answer every request with `{method, args}`
    fn spawn_echo_responder(mut requests: mpsc::UnboundedReceiver<RpcRequest>, rpc: RpcClient) {
        tokio::spawn(async move {
            while let Some(request) = requests.recv().await {
                let value = json!({ "method": request.method, "args": request.args });
                let _ = rpc.deliver(RpcResponse { id: request.id, value });
            }
        });
    }

    #[tokio::test]
    async fn test_concurrent_calls_resolve_their_own_responses_in_reverse_order() {
        let mut h = harness(idle_job()).await;

        let mut callers = Vec::new();
        for method in ["m1", "m2", "m3"] {
            let rpc = h.bridge.rpc_client();
            callers.push(tokio::spawn(async move { rpc.invoke(method, vec![json!(method)]).await }));
        }

        let mut by_method = HashMap::new();
        for _ in 0..3 {
            let request = h.requests.recv().await.unwrap();
            by_method.insert(request.method.clone(), request.id);
        }
        let ids: HashSet<&CallId> = by_method.values().collect();
        assert_eq!(ids.len(), 3);
        assert_eq!(h.bridge.health().await.unwrap().pending_calls, 3);

        for method in ["m3", "m2", "m1"] {
            assert!(h.bridge.deliver_rpc_response(by_method[method].clone(), json!(format!("{}-result", method))));
        }

        let results: Vec<_> = futures_join(callers).await;
        assert_eq!(results, vec![Ok(json!("m1-result")), Ok(json!("m2-result")), Ok(json!("m3-result"))]);
        assert_eq!(h.bridge.health().await.unwrap().pending_calls, 0);
    }

    async fn futures_join(handles: Vec<JoinHandle<Result<Value, BridgeError>>>) -> Vec<Result<Value, BridgeError>> {
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test]
    async fn test_duplicate_response_resolves_caller_once() {
        let mut h = harness(idle_job()).await;

        let rpc = h.bridge.rpc_client();
        let first = tokio::spawn(async move { rpc.invoke("sign", vec![]).await });
        let request = h.requests.recv().await.unwrap();

        assert!(h.bridge.deliver_rpc_response(request.id.clone(), json!("first")));
        assert!(h.bridge.deliver_rpc_response(request.id.clone(), json!("second")));

        assert_eq!(first.await.unwrap(), Ok(json!("first")));

        // A fresh call is unaffected by the stale duplicate.
        let rpc = h.bridge.rpc_client();
        let next = tokio::spawn(async move { rpc.invoke("sign", vec![]).await });
        let next_request = h.requests.recv().await.unwrap();
        assert_ne!(next_request.id, request.id);
        h.bridge.deliver_rpc_response(next_request.id, json!("next"));
        assert_eq!(next.await.unwrap(), Ok(json!("next")));
    }

    #[tokio::test]
    async fn test_response_for_unknown_id_is_acknowledged_and_ignored() {
        let h = harness(idle_job()).await;

        assert!(h.bridge.deliver_rpc_response(CallId::from("task-1-0.123"), json!("orphan")));

        let health = h.bridge.health().await.unwrap();
        assert_eq!(health.pending_calls, 0);
        assert!(!health.job_running);
    }

    #[tokio::test]
    async fn test_second_start_while_running_is_busy_without_side_effects() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let h = harness(Arc::new(GatedJob { started: started.clone(), release: release.clone() })).await;

        let ticket = h.bridge.request_job_start().await.unwrap().into_ticket().expect("first start accepted");
        started.notified().await;
        assert_eq!(h.session.read_count(), 1);
        assert_eq!(h.config.persisted().await.request.cookie, "a=1;b=2;");

        let second = h.bridge.request_job_start().await.unwrap();
        assert!(second.is_busy());
        assert_eq!(second.as_str(), "busy");
        assert_eq!(h.session.read_count(), 1);
        assert_eq!(h.config.write_count(), 1);

        let status = h.bridge.executor_status().await.unwrap();
        assert!(status.is_running);
        assert_eq!(status.jobs_started, 1);
        assert_eq!(h.bridge.health().await.unwrap().pending_calls, 0);

        release.notify_one();
        let report = ticket.wait().await.unwrap();
        assert!(report.succeeded());
        assert!(!h.bridge.executor_status().await.unwrap().is_running);
    }

    #[tokio::test]
    async fn test_failed_job_returns_to_idle() {
        let job = Arc::new(FailingJob { runs: AtomicUsize::new(0) });
        let h = harness(job.clone()).await;

        let first = h.bridge.request_job_start().await.unwrap();
        assert_eq!(first.as_str(), "success");
        let report = first.into_ticket().unwrap().wait().await.unwrap();
        assert_eq!(report.outcome, Err(BridgeError::Job("download failed".to_string())));

        let second = h.bridge.request_job_start().await.unwrap();
        assert!(!second.is_busy());
        second.into_ticket().unwrap().wait().await.unwrap();

        assert_eq!(job.runs.load(Ordering::SeqCst), 2);
        let status = h.bridge.executor_status().await.unwrap();
        assert_eq!(status, ExecutorStatus { is_running: false, jobs_started: 2, jobs_failed: 2 });
    }

    #[tokio::test]
    async fn test_failed_auth_sync_skips_body_and_returns_to_idle() {
        let job = Arc::new(FailingJob { runs: AtomicUsize::new(0) });
        let h = harness(job.clone()).await;
        h.config.fail_writes(true);

        let report = h.bridge.request_job_start().await.unwrap().into_ticket().unwrap().wait().await.unwrap();

        assert!(matches!(report.outcome, Err(BridgeError::FileSystem(_))));
        assert_eq!(job.runs.load(Ordering::SeqCst), 0);
        assert_eq!(h.config.reload_count(), 0);
        assert!(!h.bridge.request_job_start().await.unwrap().is_busy());
    }

    #[tokio::test]
    async fn test_panicking_job_returns_to_idle() {
        let h = harness(Arc::new(PanickingJob)).await;

        let report = h.bridge.request_job_start().await.unwrap().into_ticket().unwrap().wait().await.unwrap();

        assert!(matches!(report.outcome, Err(BridgeError::Job(_))));
        assert!(!h.bridge.request_job_start().await.unwrap().is_busy());
    }

    #[tokio::test]
    async fn test_plan_job_dispatches_calls_through_broker() {
        let plan = CallPlan::from_yaml(
            r#"
name: sign-feed
calls:
  - method: sign
    args: ["/api/v4/a"]
  - method: sign
    args: ["/api/v4/b"]
  - method: version
"#
        )
        .unwrap();
        let job = Arc::new(PlanJob::new(plan));
        let h = harness(job.clone()).await;
        spawn_echo_responder(h.requests, h.bridge.rpc_client());

        let report = h.bridge.request_job_start().await.unwrap().into_ticket().unwrap().wait().await.unwrap();
        assert!(report.succeeded());

        let outcomes = job.take_outcomes().await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].result, Ok(json!({ "method": "sign", "args": ["/api/v4/a"] })));
        assert_eq!(outcomes[1].result, Ok(json!({ "method": "sign", "args": ["/api/v4/b"] })));
        assert_eq!(outcomes[2].result, Ok(json!({ "method": "version", "args": [] })));
    }

    #[tokio::test]
    async fn test_rpc_trigger_returns_null_when_context_is_silent() {
        let settings = BrokerSettings { call_timeout: Some(Duration::from_millis(30)), log_payloads: true };
        let h = harness_with(idle_job(), settings, false).await;

        assert_eq!(h.bridge.request_rpc_trigger("sign", vec![json!("/api")]).await, Value::Null);
        assert_eq!(h.bridge.health().await.unwrap().pending_calls, 0);
    }

    #[tokio::test]
    async fn test_rpc_trigger_returns_value() {
        let h = harness(idle_job()).await;
        spawn_echo_responder(h.requests, h.bridge.rpc_client());

        let value = h.bridge.request_rpc_trigger("sign", vec![json!(1)]).await;

        assert_eq!(value, json!({ "method": "sign", "args": [1] }));
    }

    #[tokio::test]
    async fn test_http_get_syncs_auth_before_request() {
        let h = harness(idle_job()).await;

        let value = h.bridge.http_get("https://www.zhihu.com/api/v4/me", &HashMap::new()).await;

        assert_eq!(value, json!({ "url": "https://www.zhihu.com/api/v4/me" }));
        assert_eq!(*h.http.seen.lock().await, vec!["a=1;b=2;".to_string()]);
    }

    #[tokio::test]
    async fn test_http_get_failure_degrades_to_empty_object() {
        let h = harness_with(idle_job(), BrokerSettings::default(), true).await;

        let value = h.bridge.http_get("https://www.zhihu.com/api/v4/me", &HashMap::new()).await;

        assert_eq!(value, json!({}));
    }

    #[tokio::test]
    async fn test_http_get_with_failed_sync_skips_request() {
        let h = harness(idle_job()).await;
        h.session.fail_reads(true);

        let value = h.bridge.http_get("https://www.zhihu.com/api/v4/me", &HashMap::new()).await;

        assert_eq!(value, json!({}));
        assert!(h.http.seen.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_session_storage() {
        let h = harness(idle_job()).await;

        assert!(h.bridge.clear_session_storage().await.unwrap());
        let value = h.bridge.http_get("https://example.com", &HashMap::new()).await;
        assert_eq!(value, json!({ "url": "https://example.com" }));
        assert_eq!(*h.http.seen.lock().await, vec![String::new()]);
    }

    #[tokio::test]
    async fn test_path_config_reports_layout() {
        let h = harness(idle_job()).await;
        let dir = std::env::temp_dir().join("sigbridge-tests");

        let paths = h.bridge.path_config().unwrap();

        assert_eq!(paths["configDir"], json!(dir.to_str().unwrap()));
        assert_eq!(paths["configPath"], json!(dir.join("config.json").to_str().unwrap()));
        assert_eq!(paths["sessionPath"], json!(dir.join("session.json").to_str().unwrap()));
    }

    #[tokio::test]
    async fn test_pump_forwards_stream_responses() {
        let mut h = harness(idle_job()).await;
        let (tx, rx) = mpsc::unbounded_channel();
        let pump = h.bridge.pump_responses(rx);

        let rpc = h.bridge.rpc_client();
        let caller = tokio::spawn(async move { rpc.invoke("sign", vec![]).await });
        let request = h.requests.recv().await.unwrap();

        tx.send(RpcResponse { id: request.id, value: json!("pumped") }).unwrap();
        assert_eq!(caller.await.unwrap(), Ok(json!("pumped")));

        drop(tx);
        pump.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_fails_pending_calls() {
        let mut h = harness(idle_job()).await;

        let rpc = h.bridge.rpc_client();
        let caller = tokio::spawn(async move { rpc.invoke("sign", vec![]).await });
        h.requests.recv().await.unwrap();

        let rpc = h.bridge.rpc_client();
        h.bridge.shutdown().await.unwrap();

        assert_eq!(caller.await.unwrap(), Err(BridgeError::Shutdown));
        assert!(rpc.invoke("sign", vec![]).await.is_err());
    }
}
