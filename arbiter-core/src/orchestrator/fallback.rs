//! Sequential priority-ordered fallback

use super::audit::AuditRecord;
use super::Orchestrator;
use crate::protocol::types::{Request, Response, TaskType};
use crate::providers::{ProviderAdapter, ProviderError};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

impl Orchestrator {
    /// Try providers one at a time in priority order until one answers.
    ///
    /// Never fails: when nothing can be attempted, or every attempt fails,
    /// a synthetic low-confidence [`Response`] is returned instead. An
    /// explicit `priority_override` replaces the router's order as given.
    pub async fn call_with_fallback(
        &self,
        request: &Request,
        priority_override: Option<&[String]>,
    ) -> Response {
        let started = Instant::now();
        let order = self.fallback_order(request.task_type, priority_override);

        let candidates: Vec<&Arc<dyn ProviderAdapter>> = order
            .iter()
            .filter_map(|id| self.registry.get(id))
            .filter(|adapter| self.is_callable(adapter.id()))
            .collect();

        if candidates.is_empty() {
            warn!(
                "No provider available for {} request (order: [{}])",
                request.task_type,
                order.join(", ")
            );
            return Response::no_providers_available();
        }

        let mut failures: Vec<(String, ProviderError)> = Vec::with_capacity(candidates.len());
        for adapter in candidates {
            match self.attempt(adapter, request).await {
                Ok(response) => {
                    if !failures.is_empty() {
                        info!(
                            "Fell back to {} after {} failed provider(s)",
                            response.provider_id,
                            failures.len()
                        );
                    }
                    self.emit(AuditRecord::single(request, &response, self.preview_chars))
                        .await;
                    return response;
                }
                Err(err) => failures.push((adapter.id().to_string(), err)),
            }
        }

        let summary = failures
            .iter()
            .map(|(id, err)| format!("{}: {}", id, err.summary()))
            .collect::<Vec<_>>()
            .join("; ");
        error!("All providers failed for {} request: {}", request.task_type, summary);

        let placeholder = Response::all_providers_failed();
        let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.emit(AuditRecord::exhausted(
            request,
            failures.into_iter().map(|(id, _)| id).collect(),
            &placeholder,
            summary,
            latency_ms,
            self.preview_chars,
        ))
        .await;
        placeholder
    }

    /// Candidate order before filtering: the override when given, else the
    /// router's order for the task type. Duplicates keep their first position.
    pub(crate) fn fallback_order(
        &self,
        task_type: TaskType,
        priority_override: Option<&[String]>,
    ) -> Vec<String> {
        let mut order = match priority_override {
            Some(ids) => ids.to_vec(),
            None => self.router.priority_for(task_type),
        };

        let mut seen = HashSet::new();
        order.retain(|id| seen.insert(id.clone()));
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::routing::PriorityRouter;
    use crate::providers::{AdapterReply, ProviderResult};
    use async_trait::async_trait;

    struct Named(&'static str);

    #[async_trait]
    impl ProviderAdapter for Named {
        fn id(&self) -> &str {
            self.0
        }

        fn model(&self) -> &str {
            "test"
        }

        async fn send(&self, _request: &Request) -> ProviderResult<AdapterReply> {
            Ok(AdapterReply::new("ok", "test"))
        }
    }

    fn orchestrator() -> Orchestrator {
        Orchestrator::builder()
            .provider(Arc::new(Named("openai")))
            .provider(Arc::new(Named("local")))
            .provider(Arc::new(Named("anthropic")))
            .router(PriorityRouter::new().with_priority(TaskType::Analysis, ["anthropic", "openai"]))
            .build()
    }

    #[test]
    fn test_router_order_excludes_unlisted_providers() {
        let order = orchestrator().fallback_order(TaskType::Analysis, None);
        assert_eq!(order, vec!["anthropic", "openai"]);
    }

    #[test]
    fn test_override_used_as_given_without_duplicates() {
        let custom = vec!["local".to_string(), "openai".to_string(), "local".to_string()];
        let order = orchestrator().fallback_order(TaskType::Analysis, Some(custom.as_slice()));
        assert_eq!(order, vec!["local", "openai"]);
    }
}
