//! PreCommandRunner (§1, §4.2 step 8, §4.9 step 1) — runs a shell command on
//! UP/DOWN transitions. Effect-only: its failure is logged and must never
//! abort the notification dispatch that follows it.

use async_trait::async_trait;
use tokio::process::Command;

use crate::model::Status;

#[async_trait]
pub trait PreCommandRunner: Send + Sync {
    async fn run(&self, status: Status, monitor_public_json: &serde_json::Value, command: &str) -> Result<(), String>;
}

/// Runs the command through `/bin/sh -c`, exposing the new status and the
/// monitor's public JSON as environment variables.
pub struct ShellPreCommandRunner;

#[async_trait]
impl PreCommandRunner for ShellPreCommandRunner {
    async fn run(&self, status: Status, monitor_public_json: &serde_json::Value, command: &str) -> Result<(), String> {
        let status_str = match status {
            Status::Up => "up",
            Status::Down => "down",
            Status::Pending => "pending",
            Status::Maintenance => "maintenance",
        };
        let output = Command::new("/bin/sh")
            .arg("-c")
            .arg(command)
            .env("PULSEWATCH_STATUS", status_str)
            .env("PULSEWATCH_MONITOR_JSON", monitor_public_json.to_string())
            .output()
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(format!(
                "pre-command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        Ok(())
    }
}

/// Test/embedding double that records every invocation without spawning.
#[derive(Default)]
pub struct RecordingPreCommandRunner {
    pub runs: std::sync::Mutex<Vec<(Status, serde_json::Value, String)>>,
}

#[async_trait]
impl PreCommandRunner for RecordingPreCommandRunner {
    async fn run(&self, status: Status, monitor_public_json: &serde_json::Value, command: &str) -> Result<(), String> {
        self.runs
            .lock()
            .unwrap()
            .push((status, monitor_public_json.clone(), command.to_string()));
        Ok(())
    }
}
