//! Call plans - a YAML-described job that dispatches a batch of calls
//!
//! ```yaml
//! name: sign-feed
//! calls:
//!   - method: sign
//!     args: ["/api/v4/members/me"]
//!   - method: sign
//!     args: ["/api/v4/questions/1"]
//! ```

use std::{fs, path::Path};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{sync::Mutex, task::JoinSet};

use crate::{
    domain::error::BridgeError,
    port::job::{Job, JobContext}
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedCall {
    pub method: String,
    #[serde(default)]
    pub args:   Vec<Value>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallPlan {
    #[serde(default = "default_plan_name")]
    pub name:  String,
    pub calls: Vec<PlannedCall>
}

fn default_plan_name() -> String {
    "plan".to_string()
}

impl CallPlan {
    pub fn from_yaml(content: &str) -> Result<Self, BridgeError> {
        let plan: CallPlan = serde_yaml::from_str(content)?;
        if plan.calls.is_empty() {
            return Err(BridgeError::Configuration(format!("plan '{}' has no calls", plan.name)));
        }
        Ok(plan)
    }

    pub fn from_file(path: &Path) -> Result<Self, BridgeError> {
        let content = fs::read_to_string(path)
            .map_err(|e| BridgeError::FileSystem(format!("Failed to read plan {}: {}", path.display(), e)))?;
        Self::from_yaml(&content)
    }
}

/// Result of one planned call, in plan order
#[derive(Debug, Clone, PartialEq)]
pub struct CallOutcome {
    pub method: String,
    pub result: Result<Value, BridgeError>
}

/// Job body that runs every call of a plan concurrently
pub struct PlanJob {
    plan:     CallPlan,
    outcomes: Mutex<Vec<CallOutcome>>
}

impl PlanJob {
    pub fn new(plan: CallPlan) -> Self {
        Self { plan, outcomes: Mutex::new(Vec::new()) }
    }

    /// Outcomes of the most recent run
    pub async fn take_outcomes(&self) -> Vec<CallOutcome> {
        std::mem::take(&mut *self.outcomes.lock().await)
    }
}

#[async_trait]
impl Job for PlanJob {
    async fn run(&self, context: JobContext) -> Result<(), BridgeError> {
        let mut tasks = JoinSet::new();
        for (index, call) in self.plan.calls.iter().cloned().enumerate() {
            let rpc = context.rpc.clone();
            tasks.spawn(async move {
                let result = rpc.invoke(call.method.clone(), call.args).await;
                (index, CallOutcome { method: call.method, result })
            });
        }

        let mut outcomes: Vec<Option<CallOutcome>> = vec![None; self.plan.calls.len()];
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| BridgeError::Job(format!("plan call task failed: {}", e)))?;
            outcomes[index] = Some(outcome);
        }

        let outcomes: Vec<CallOutcome> = outcomes.into_iter().flatten().collect();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        *self.outcomes.lock().await = outcomes;

        if failed > 0 {
            return Err(BridgeError::Job(format!(
                "{} of {} calls in plan '{}' failed",
                failed,
                self.plan.calls.len(),
                self.plan.name
            )));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.plan.name
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parse_plan() {
        let plan = CallPlan::from_yaml(
            r#"
name: sign-feed
calls:
  - method: sign
    args: ["/api/v4/members/me", 2]
  - method: ping
"#
        )
        .unwrap();

        assert_eq!(plan.name, "sign-feed");
        assert_eq!(plan.calls.len(), 2);
        assert_eq!(plan.calls[0].args, vec![json!("/api/v4/members/me"), json!(2)]);
        assert!(plan.calls[1].args.is_empty());
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        let result = CallPlan::from_yaml("calls: []");

        assert!(matches!(result, Err(BridgeError::Configuration(_))));
    }

    #[test]
    fn test_plan_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("plan.yaml");
        fs::write(&path, "calls:\n  - method: sign\n").unwrap();

        let plan = CallPlan::from_file(&path).unwrap();

        assert_eq!(plan.name, "plan");
        assert_eq!(plan.calls[0].method, "sign");
    }
}
