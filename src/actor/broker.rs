//! Broker Actor - dispatches calls into the isolated context and correlates responses
//!
//! The Broker owns the correlation registry. Because an actor handles one
//! message at a time, every registry insert and removal happens inside a
//! single handler and concurrent callers never observe a half-updated table.
//! - Invoke: generate id, register pending call, queue request for the dispatcher
//! - DispatchFailed: take pending call by id, resolve it with the transport error
//! - Response: take pending call by id, resolve the waiting caller
//! - Expire: resolve a still-pending call with a no-response error
//!
//! Handlers never await the transport. Writes happen on a dispatcher task
//! that reports failures back as messages, so a stalled context cannot hold
//! up responses, deadlines or status queries.

use std::sync::Arc;

use ractor::{
    Actor, ActorProcessingErr, ActorRef,
    rpc::{CallResult, call}
};
use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{Level, event};

use crate::{
    actor::{
        message::BrokerMessage,
        registry::{Completion, CorrelationRegistry, PendingCall}
    },
    domain::{
        constant::broker,
        error::BridgeError,
        rpc::{CallId, CallIdGenerator, RpcRequest, RpcResponse}
    },
    port::channel::ContextChannel,
    service::config::BrokerSettings
};

/// Broker Actor State
pub struct BrokerState {
    /// Pending calls by correlation id
    registry:   CorrelationRegistry,
    /// Id source, private to this broker
    ids:        CallIdGenerator,
    /// Queue feeding the dispatcher task, in invocation order
    outbound:   mpsc::UnboundedSender<RpcRequest>,
    dispatcher: JoinHandle<()>,
    settings:   BrokerSettings,
    /// Calls resolved with a response from the context
    completed:  u64
}

/// Broker Actor - correlation point between callers and the isolated context
pub struct Broker;

#[async_trait::async_trait]
impl Actor for Broker {
    type Arguments = (Arc<dyn ContextChannel>, BrokerSettings);
    type Msg = BrokerMessage;
    type State = BrokerState;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        (channel, settings): Self::Arguments
    ) -> Result<Self::State, ActorProcessingErr> {
        event!(Level::DEBUG, event = broker::BROKER_STARTED, channel = channel.name(),
               call_timeout_ms = ?settings.call_timeout.map(|t| t.as_millis()));

        let (outbound, requests) = mpsc::unbounded_channel();
        let dispatcher = tokio::spawn(dispatch_requests(channel, requests, myself));

        Ok(BrokerState {
            registry: CorrelationRegistry::new(),
            ids: CallIdGenerator::new(),
            outbound,
            dispatcher,
            settings,
            completed: 0
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State
    ) -> Result<(), ActorProcessingErr> {
        match message {
            BrokerMessage::Invoke { method, args, reply } => self.handle_invoke(myself, method, args, reply, state),
            BrokerMessage::DispatchFailed { id, error } => self.handle_dispatch_failed(id, error, state),
            BrokerMessage::Response(response) => self.handle_response(response, state),
            BrokerMessage::Expire { id } => self.handle_expire(id, state),
            BrokerMessage::PendingCount { reply } => {
                if let Err(e) = reply.send(state.registry.len()) {
                    event!(Level::ERROR, event = broker::REPLY_DROPPED, error = %e);
                }
            }
        }
        Ok(())
    }

    async fn post_stop(&self, _myself: ActorRef<Self::Msg>, state: &mut Self::State) -> Result<(), ActorProcessingErr> {
        state.dispatcher.abort();

        let abandoned = state.registry.drain();
        let count = abandoned.len();
        for call in abandoned {
            call.resolve(Err(BridgeError::Shutdown));
        }

        event!(Level::DEBUG, event = broker::BROKER_STOPPED,
               failed_pending = %count,
               issued = %state.ids.issued(),
               completed = %state.completed);
        Ok(())
    }
}

impl Broker {
    /// Spawn a broker bound to `channel`
    pub async fn spawn(
        name: Option<String>,
        channel: Arc<dyn ContextChannel>,
        settings: BrokerSettings
    ) -> Result<(ActorRef<BrokerMessage>, JoinHandle<()>), BridgeError> {
        Ok(Actor::spawn(name, Broker, (channel, settings)).await?)
    }

    fn handle_invoke(
        &self,
        myself: ActorRef<BrokerMessage>,
        method: String,
        args: Vec<Value>,
        reply: Completion,
        state: &mut BrokerState
    ) {
        let id = state.ids.next_id();
        let request = RpcRequest { method, args, id: id.clone() };

        // Armed before the write so a context that never reads still expires.
        let mut call = PendingCall::new(&request, reply);
        if let Some(timeout) = state.settings.call_timeout {
            let expire_id = id.clone();
            let timer = tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                // The broker may already be gone; nothing is left to expire then.
                let _ = myself.cast(BrokerMessage::Expire { id: expire_id });
            });
            call = call.with_timer(timer.abort_handle());
        }

        if let Err((e, call)) = state.registry.put(call) {
            event!(Level::ERROR, event = broker::CALL_DISPATCH_FAILED, id = %id, error = %e);
            call.resolve(Err(e));
            return;
        }

        if state.settings.log_payloads {
            let payload = serde_json::to_string(&request).unwrap_or_default();
            event!(Level::DEBUG, event = broker::CALL_QUEUED, id = %id, payload = %payload);
        }

        let method = request.method.clone();
        if state.outbound.send(request).is_err() {
            let e = BridgeError::Channel("request dispatcher is not running".to_string());
            event!(Level::ERROR, event = broker::CALL_DISPATCH_FAILED, id = %id, method = %method, error = %e);
            if let Some(call) = state.registry.take(&id) {
                call.resolve(Err(e));
            }
            return;
        }

        event!(Level::DEBUG, event = broker::CALL_QUEUED,
               id = %id, method = %method, pending = %state.registry.len());
    }

    fn handle_dispatch_failed(&self, id: CallId, error: BridgeError, state: &mut BrokerState) {
        // Already expired while the write was stuck.
        let Some(call) = state.registry.take(&id) else {
            return;
        };

        event!(Level::ERROR, event = broker::CALL_DISPATCH_FAILED, id = %id, method = %call.method, error = %error);
        call.resolve(Err(error));
    }

    fn handle_response(&self, response: RpcResponse, state: &mut BrokerState) {
        let Some(call) = state.registry.take(&response.id) else {
            event!(Level::WARN, event = broker::RESPONSE_UNMATCHED, id = %response.id,
                   message = "no pending call for id, response discarded");
            return;
        };

        state.completed += 1;
        let waited_ms = call.dispatched_at.elapsed().as_millis();
        let method = call.method.clone();

        if call.resolve(Ok(response.value)) {
            event!(Level::DEBUG, event = broker::CALL_COMPLETED,
                   id = %response.id, method = %method, waited_ms = %waited_ms);
        } else {
            event!(Level::DEBUG, event = broker::CALL_ABANDONED,
                   id = %response.id, method = %method, message = "caller no longer waiting");
        }
    }

    fn handle_expire(&self, id: CallId, state: &mut BrokerState) {
        // Already answered: the timer outlived its call.
        let Some(call) = state.registry.take(&id) else {
            return;
        };

        let waited_ms = call.dispatched_at.elapsed().as_millis() as u64;
        event!(Level::WARN, event = broker::CALL_TIMED_OUT, id = %id, method = %call.method, waited_ms = %waited_ms);
        call.resolve(Err(BridgeError::NoResponse { id: id.to_string(), waited_ms }));
    }
}

/// Write queued requests to the context one at a time, in order.
///
/// Runs until the broker drops its queue or stops accepting messages.
async fn dispatch_requests(
    channel: Arc<dyn ContextChannel>,
    mut requests: mpsc::UnboundedReceiver<RpcRequest>,
    broker: ActorRef<BrokerMessage>
) {
    while let Some(request) = requests.recv().await {
        let id = request.id.clone();
        match channel.send(request).await {
            Ok(()) => event!(Level::DEBUG, event = broker::CALL_DISPATCHED, id = %id),
            Err(error) => {
                if broker.cast(BrokerMessage::DispatchFailed { id, error }).is_err() {
                    break;
                }
            }
        }
    }
    event!(Level::DEBUG, event = broker::DISPATCHER_STOPPED, channel = channel.name());
}

/// Cloneable caller-side handle to a Broker.
///
/// `invoke` looks like an ordinary async function call; the calling task
/// suspends until the isolated context answers (or the call expires).
#[derive(Debug, Clone)]
pub struct RpcClient {
    broker: ActorRef<BrokerMessage>
}

impl RpcClient {
    pub fn new(broker: ActorRef<BrokerMessage>) -> Self {
        Self { broker }
    }

    /// Invoke `method` inside the isolated context and wait for its value
    pub async fn invoke(&self, method: impl Into<String>, args: Vec<Value>) -> Result<Value, BridgeError> {
        let method = method.into();
        match call(&self.broker, |reply| BrokerMessage::invoke(method, args, reply), None).await {
            Ok(CallResult::Success(result)) => result,
            Ok(CallResult::Timeout) => Err(BridgeError::Messaging("broker call timed out".to_string())),
            Ok(CallResult::SenderError) => Err(BridgeError::Shutdown),
            Err(e) => Err(BridgeError::from(e))
        }
    }

    /// Hand a response from the isolated context to the broker
    pub fn deliver(&self, response: RpcResponse) -> Result<(), BridgeError> {
        self.broker.cast(BrokerMessage::from(response)).map_err(BridgeError::from)
    }

    /// Number of calls still waiting for a response
    pub async fn pending_calls(&self) -> Result<usize, BridgeError> {
        match call(&self.broker, |reply| BrokerMessage::PendingCount { reply }, None).await {
            Ok(CallResult::Success(count)) => Ok(count),
            Ok(_) => Err(BridgeError::Shutdown),
            Err(e) => Err(BridgeError::from(e))
        }
    }

    pub(crate) fn actor(&self) -> &ActorRef<BrokerMessage> {
        &self.broker
    }
}
