//! Command-line surface of the bridge binary

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct BridgeCli {
    /// Program hosting the isolated context (speaks newline-delimited JSON on stdio)
    #[arg(long, global = true)]
    pub context:      Option<String>,
    /// Argument passed to the context program (repeatable)
    #[arg(long = "context-arg", global = true)]
    pub context_args: Vec<String>,
    /// Seconds to wait for a response before failing a call (0 waits forever)
    #[arg(long, global = true, default_value_t = 60)]
    pub timeout_secs: u64,
    /// Configuration directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config_dir:   Option<PathBuf>,
    /// Verbose logging, including every dispatched payload
    #[arg(long, global = true)]
    pub debug:        bool,
    /// Subcommands
    #[command(subcommand)]
    pub command:      BridgeCliCommand
}

#[derive(Subcommand, Debug)]
pub enum BridgeCliCommand {
    /// Dispatch one call into the isolated context and print the result
    Call {
        /// Remote method name
        method: String,
        /// Arguments; each is parsed as JSON, or taken as a plain string
        args:   Vec<String>
    },
    /// Run a call plan as a single-flight job
    Job {
        /// YAML plan file
        #[arg(long)]
        plan: PathBuf
    },
    /// Authenticated GET; failures print `{}`
    HttpGet {
        url:    String,
        /// Query parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>
    },
    /// Remove all stored session credentials
    ClearSession,
    /// Print the resolved configuration file layout
    Paths
}

impl BridgeCliCommand {
    /// Whether the command needs a live isolated context
    pub fn needs_context(&self) -> bool {
        matches!(self, BridgeCliCommand::Call { .. } | BridgeCliCommand::Job { .. })
    }
}

pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}

/// JSON if it parses, otherwise the raw text as a JSON string
pub fn parse_call_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_call_command() {
        let cli = BridgeCli::try_parse_from([
            "sigbridge",
            "--context",
            "node",
            "--context-arg",
            "rpc.js",
            "call",
            "sign",
            "/api/v4/me",
            "{\"page\":2}"
        ])
        .unwrap();

        assert_eq!(cli.context.as_deref(), Some("node"));
        assert_eq!(cli.context_args, vec!["rpc.js".to_string()]);
        assert_eq!(cli.timeout_secs, 60);
        match cli.command {
            BridgeCliCommand::Call { method, args } => {
                assert_eq!(method, "sign");
                let parsed: Vec<Value> = args.iter().map(String::as_str).map(parse_call_arg).collect();
                assert_eq!(parsed, vec![json!("/api/v4/me"), json!({ "page": 2 })]);
            }
            other => panic!("unexpected command {:?}", other)
        }
    }

    #[test]
    fn test_parse_http_get_params() {
        let cli = BridgeCli::try_parse_from([
            "sigbridge",
            "http-get",
            "https://www.zhihu.com/api/v4/me",
            "--param",
            "include=email",
            "--timeout-secs",
            "0"
        ])
        .unwrap();

        assert_eq!(cli.timeout_secs, 0);
        assert!(!cli.command.needs_context());
        match cli.command {
            BridgeCliCommand::HttpGet { params, .. } => {
                assert_eq!(params, vec![("include".to_string(), "email".to_string())]);
            }
            other => panic!("unexpected command {:?}", other)
        }
    }

    #[test]
    fn test_parse_paths_command() {
        let cli = BridgeCli::try_parse_from(["sigbridge", "paths", "--config-dir", "/tmp/sigbridge"]).unwrap();

        assert!(matches!(cli.command, BridgeCliCommand::Paths));
        assert!(!cli.command.needs_context());
        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/sigbridge")));
    }

    #[test]
    fn test_bad_param_is_rejected() {
        assert!(BridgeCli::try_parse_from(["sigbridge", "http-get", "https://x", "--param", "novalue"]).is_err());
    }
}
