//! JSON manifest of named tasks and their dependency edges.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

fn default_jobs() -> usize {
    1
}

/// A manifest file: a parallelism hint plus a list of tasks.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Default number of concurrent tasks; overridable with `--jobs`.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// The tasks to run.
    pub tasks: Vec<TaskSpec>,
}

/// One named shell command with dependency edges.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskSpec {
    /// Unique task name; referenced by other tasks' `requires`.
    pub name: String,
    /// Names of tasks that must complete before this one starts.
    #[serde(default)]
    pub requires: Vec<String>,
    /// Program and arguments.
    pub command: Vec<String>,
    /// Working directory for the command.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

impl Manifest {
    /// Read and parse a manifest file.
    pub fn load(path: &Path) -> Result<Self, anyhow::Error> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&text)
            .with_context(|| format!("parsing manifest {}", path.display()))?;
        Ok(manifest)
    }

    /// Static checks the queue cannot do for us up front.
    ///
    /// Returns human-readable problems; an empty list means the manifest
    /// can at least be scheduled.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.name.as_str()) {
                issues.push(format!("duplicate task name `{}`", task.name));
            }
            if task.command.is_empty() {
                issues.push(format!("task `{}` has an empty command", task.name));
            }
            if task.requires.iter().any(|req| *req == task.name) {
                issues.push(format!("task `{}` requires itself", task.name));
            }
        }

        let names: HashSet<&str> = self.tasks.iter().map(|t| t.name.as_str()).collect();
        for task in &self.tasks {
            for req in &task.requires {
                if !names.contains(req.as_str()) {
                    issues.push(format!(
                        "task `{}` requires unknown task `{req}`",
                        task.name
                    ));
                }
            }
        }

        let cycle = self.cycle_names(&names);
        if !cycle.is_empty() {
            issues.push(format!("dependency cycle involving: {}", cycle.join(", ")));
        }

        issues
    }

    /// Kahn-style elimination: peel off tasks whose known requirements
    /// are all resolved; whatever is left participates in a cycle.
    fn cycle_names(&self, names: &HashSet<&str>) -> Vec<String> {
        let mut pending: HashMap<&str, Vec<&str>> = self
            .tasks
            .iter()
            .map(|task| {
                let reqs = task
                    .requires
                    .iter()
                    .map(String::as_str)
                    // Unknown requirements are reported separately; they
                    // cannot be part of a cycle.
                    .filter(|req| names.contains(req) && *req != task.name)
                    .collect();
                (task.name.as_str(), reqs)
            })
            .collect();

        let mut resolved: HashSet<&str> = HashSet::new();
        loop {
            let next: Vec<&str> = pending
                .iter()
                .filter(|(_, reqs)| reqs.iter().all(|req| resolved.contains(req)))
                .map(|(name, _)| *name)
                .collect();
            if next.is_empty() {
                break;
            }
            for name in next {
                pending.remove(name);
                resolved.insert(name);
            }
        }

        let mut stuck: Vec<String> = pending.keys().map(|name| name.to_string()).collect();
        stuck.sort();
        stuck
    }
}
