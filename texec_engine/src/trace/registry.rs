//! Task name registry
//!
//! Latest-name-wins mapping from task id to display label. Entries are never
//! evicted: task ids may be reused over a long trace and the newest name is
//! the one to show.

use std::collections::HashMap;

/// Label used when a task id was never named
pub fn synthetic_label(task_id: u32) -> String {
    format!("Task #{task_id}")
}

#[derive(Debug, Clone, Default)]
pub struct TaskNameRegistry {
    names: HashMap<u32, String>,
}

impl TaskNameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name` to `task_id`, replacing any previous name
    pub fn bind(&mut self, task_id: u32, name: impl Into<String>) {
        self.names.insert(task_id, name.into());
    }

    pub fn resolve(&self, task_id: u32) -> Option<&str> {
        self.names.get(&task_id).map(|s| s.as_str())
    }

    /// Resolved name or the synthetic `Task #<id>` label
    pub fn label(&self, task_id: u32) -> String {
        self.resolve(task_id)
            .map(str::to_string)
            .unwrap_or_else(|| synthetic_label(task_id))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
