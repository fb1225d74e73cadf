//! # sigbridge CLI
//!
//! Runs an isolated context as a child process and talks to it through the
//! correlation broker.
//!
//! ## Usage
//!
//! ```bash
//! # Dispatch one call and print the value the context returns
//! sigbridge --context node --context-arg rpc.js call sign /api/v4/me
//!
//! # Run every call of a plan as one single-flight job
//! sigbridge --context node --context-arg rpc.js job --plan plan.yaml
//!
//! # Authenticated GET using the stored session
//! sigbridge http-get https://www.zhihu.com/api/v4/me --param include=email
//!
//! # Show where the config and session files live
//! sigbridge paths
//! ```
//!
//! The context program reads `{"method", "args", "id"}` lines on stdin and
//! writes `{"id", "value"}` lines on stdout.

use std::{collections::HashMap, sync::Arc, time::Duration};

use bridge::{
    AppContext, Bridge, BridgeError,
    adapter::channel::{ChildProcessChannel, InMemoryChannel},
    domain::command::{BridgeCli, BridgeCliCommand, parse_call_arg},
    port::channel::ContextChannel,
    service::{
        config::{AppConfig, BrokerSettings},
        plan::{CallPlan, PlanJob}
    }
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), BridgeError> {
    let cli = BridgeCli::parse();
    init_tracing(cli.debug);

    let settings = BrokerSettings {
        call_timeout: (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs)),
        log_payloads: cli.debug
    };
    let app_config = match &cli.config_dir {
        Some(dir) => AppConfig::in_dir(dir.clone()),
        None => AppConfig::init()?
    }
    .with_broker(settings);
    let context = AppContext::init(app_config).await?;

    let plan = match &cli.command {
        BridgeCliCommand::Job { plan } => CallPlan::from_file(plan)?,
        _ => CallPlan { name: "idle".to_string(), calls: Vec::new() }
    };
    let job = Arc::new(PlanJob::new(plan));

    if cli.command.needs_context() && cli.context.is_none() {
        return Err(BridgeError::Configuration("this command needs --context <program>".to_string()));
    }

    let (channel, responses) = match &cli.context {
        Some(program) => {
            let (channel, responses) = ChildProcessChannel::spawn(program, &cli.context_args)?;
            let channel: Arc<dyn ContextChannel> = Arc::new(channel);
            (channel, Some(responses))
        }
        None => {
            // Nothing will ever answer; any call fails on send.
            let channel: Arc<dyn ContextChannel> = Arc::new(InMemoryChannel::new().0);
            (channel, None)
        }
    };

    let bridge = Bridge::spawn(context, channel, job.clone()).await?;
    if let Some(responses) = responses {
        bridge.pump_responses(responses);
    }

    let result = run_command(&bridge, cli.command, &job).await;

    if let Err(e) = bridge.shutdown().await {
        eprintln!("Failed to shut down cleanly: {}", e);
    }

    result
}

async fn run_command(bridge: &Bridge, command: BridgeCliCommand, job: &PlanJob) -> Result<(), BridgeError> {
    match command {
        BridgeCliCommand::Call { method, args } => {
            let args = args.iter().map(String::as_str).map(parse_call_arg).collect();
            let value = bridge.invoke(method, args).await?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        BridgeCliCommand::Job { .. } => {
            let Some(ticket) = bridge.request_job_start().await?.into_ticket() else {
                return Err(BridgeError::Job("a job is already running".to_string()));
            };
            let report = ticket.wait().await?;

            for outcome in job.take_outcomes().await {
                match outcome.result {
                    Ok(value) => println!("{} => {}", outcome.method, value),
                    Err(e) => println!("{} failed: {}", outcome.method, e)
                }
            }
            println!(
                "job #{} finished at {} in {}ms",
                report.run_id,
                report.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
                report.elapsed.as_millis()
            );
            report.outcome
        }
        BridgeCliCommand::HttpGet { url, params } => {
            let params: HashMap<String, String> = params.into_iter().collect();
            let value = bridge.http_get(&url, &params).await;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        BridgeCliCommand::ClearSession => {
            bridge.clear_session_storage().await?;
            println!("session cleared");
            Ok(())
        }
        BridgeCliCommand::Paths => {
            println!("{}", serde_json::to_string_pretty(&bridge.path_config()?)?);
            Ok(())
        }
    }
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
