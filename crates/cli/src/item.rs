//! Work item that runs one manifest task as a child process.

use anyhow::Context;
use async_trait::async_trait;
use depq_core::{Enqueue, Work};
use tokio::process::Command;
use tracing::debug;

use crate::manifest::TaskSpec;

/// Runs a [`TaskSpec`]'s command and fails on a non-zero exit.
pub struct CommandItem {
    spec: TaskSpec,
}

impl CommandItem {
    /// Wrap a manifest task.
    pub fn new(spec: TaskSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl Work for CommandItem {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn requirements(&self) -> &[String] {
        &self.spec.requires
    }

    async fn run(&mut self, _queue: &dyn Enqueue) -> Result<(), anyhow::Error> {
        let program = self
            .spec
            .command
            .first()
            .context("task has an empty command")?;
        let mut cmd = Command::new(program);
        cmd.args(&self.spec.command[1..]);
        if let Some(cwd) = &self.spec.cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd
            .output()
            .await
            .with_context(|| format!("spawning `{program}`"))?;
        debug!(
            task = %self.spec.name,
            status = %output.status,
            stdout_bytes = output.stdout.len(),
            "command finished"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "`{}` exited with {}: {}",
                self.spec.command.join(" "),
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}
