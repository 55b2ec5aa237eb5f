//! Static task-type → provider priority policy
//!
//! Conversational and analytical work prefers the highest-quality provider
//! first; bulk categorization prefers the fastest and cheapest. There is no
//! runtime learning; callers can override the order per call.

use crate::protocol::types::TaskType;
use std::collections::HashMap;

const QUALITY_FIRST: &[&str] = &["anthropic", "openai", "gemini"];
const SPEED_FIRST: &[&str] = &["gemini", "openai", "anthropic"];
const BALANCED: &[&str] = &["openai", "anthropic", "gemini"];

/// Ordered provider preference per task type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityRouter {
    table: HashMap<TaskType, Vec<String>>,
}

impl Default for PriorityRouter {
    fn default() -> Self {
        let table = TaskType::ALL
            .into_iter()
            .map(|task| (task, builtin_order(task).iter().map(|s| s.to_string()).collect()))
            .collect();
        Self { table }
    }
}

fn builtin_order(task: TaskType) -> &'static [&'static str] {
    match task {
        TaskType::Conversational | TaskType::Analysis | TaskType::ReportDrafting => QUALITY_FIRST,
        TaskType::Categorization => SPEED_FIRST,
        TaskType::General => BALANCED,
    }
}

impl PriorityRouter {
    /// Router with the built-in policy table
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the order for one task type
    pub fn with_priority<I, S>(mut self, task: TaskType, order: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.table
            .insert(task, order.into_iter().map(Into::into).collect());
        self
    }

    /// Ordered provider ids for a task type
    pub fn priority_for(&self, task: TaskType) -> Vec<String> {
        self.table.get(&task).cloned().unwrap_or_default()
    }

    /// Whether any task type lists `provider_id`
    pub fn mentions(&self, provider_id: &str) -> bool {
        self.table
            .values()
            .any(|order| order.iter().any(|id| id == provider_id))
    }
}
