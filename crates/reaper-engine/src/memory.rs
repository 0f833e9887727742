use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use reaper_common::Condition;

use crate::types::{EngineError, ProcessEngine, ProcessInstance};

/// One call observed by [`MemoryProcessEngine`], in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Health,
    Query(Condition),
    Delete(String),
}

/// In-process engine with an ordered instance table and scriptable failures.
#[derive(Debug, Clone)]
pub struct MemoryProcessEngine {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug)]
struct Inner {
    instances: Vec<ProcessInstance>,
    healthy: bool,
    query_failures: Vec<(Condition, u16)>,
    delete_failures: HashMap<String, u16>,
    calls: Vec<EngineCall>,
}

impl MemoryProcessEngine {
    pub fn new() -> Self {
        Self::with_instances(Vec::new())
    }

    pub fn with_instances(instances: impl IntoIterator<Item = ProcessInstance>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                instances: instances.into_iter().collect(),
                healthy: true,
                query_failures: Vec::new(),
                delete_failures: HashMap::new(),
                calls: Vec::new(),
            })),
        }
    }

    pub async fn set_healthy(&self, healthy: bool) {
        self.inner.write().await.healthy = healthy;
    }

    /// Queries with exactly this condition answer `status`.
    pub async fn fail_query(&self, condition: Condition, status: u16) {
        self.inner.write().await.query_failures.push((condition, status));
    }

    pub async fn fail_delete(&self, id: &str, status: u16) {
        self.inner
            .write()
            .await
            .delete_failures
            .insert(id.to_string(), status);
    }

    pub async fn calls(&self) -> Vec<EngineCall> {
        self.inner.read().await.calls.clone()
    }

    pub async fn deleted_ids(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .calls
            .iter()
            .filter_map(|c| match c {
                EngineCall::Delete(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn remaining_ids(&self) -> Vec<String> {
        self.inner
            .read()
            .await
            .instances
            .iter()
            .map(|i| i.id.clone())
            .collect()
    }
}

impl Default for MemoryProcessEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn error_body(message: &str) -> String {
    serde_json::json!({"type": "InvalidRequestException", "message": message}).to_string()
}

/// SQL-style `LIKE` with `%` as the only wildcard.
fn like_match(pattern: &str, value: &str) -> bool {
    let parts: Vec<&str> = pattern.split('%').collect();
    if parts.len() == 1 {
        return pattern == value;
    }

    let Some(mut rest) = value.strip_prefix(parts[0]) else {
        return false;
    };
    let last = parts[parts.len() - 1];
    for part in &parts[1..parts.len() - 1] {
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }
    rest.len() >= last.len() && rest.ends_with(last)
}

fn field_eq(field: &Option<String>, expected: &Value) -> bool {
    match (field, expected.as_str()) {
        (Some(v), Some(e)) => v == e,
        _ => false,
    }
}

/// Supports the subset of history query keys needed to exercise the purge
/// pipeline; other keys are ignored.
fn matches(instance: &ProcessInstance, condition: &Condition) -> bool {
    condition.iter().all(|(key, expected)| match key.as_str() {
        "processDefinitionKey" => field_eq(&instance.process_definition_key, expected),
        "businessKey" => field_eq(&instance.business_key, expected),
        "businessKeyLike" => match (&instance.business_key, expected.as_str()) {
            (Some(bk), Some(pattern)) => like_match(pattern, bk),
            _ => false,
        },
        "state" => field_eq(&instance.state, expected),
        "processInstanceIds" => expected
            .as_array()
            .is_some_and(|ids| ids.iter().any(|id| id.as_str() == Some(instance.id.as_str()))),
        _ => true,
    })
}

#[async_trait]
impl ProcessEngine for MemoryProcessEngine {
    fn describe(&self) -> String {
        "memory://engine".to_string()
    }

    async fn health(&self) -> Result<(), EngineError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(EngineCall::Health);
        if inner.healthy {
            Ok(())
        } else {
            Err(EngineError::Transport("connection refused".into()))
        }
    }

    async fn find_instance_ids(&self, condition: &Condition) -> Result<Vec<String>, EngineError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(EngineCall::Query(condition.clone()));

        if let Some((_, status)) = inner.query_failures.iter().find(|(c, _)| c == condition) {
            return Err(EngineError::HttpStatus {
                status: *status,
                body: error_body("query failed"),
            });
        }

        Ok(inner
            .instances
            .iter()
            .filter(|i| matches(i, condition))
            .map(|i| i.id.clone())
            .collect())
    }

    async fn delete_instance(&self, id: &str) -> Result<(), EngineError> {
        let mut inner = self.inner.write().await;
        inner.calls.push(EngineCall::Delete(id.to_string()));

        if let Some(status) = inner.delete_failures.get(id).copied() {
            return Err(EngineError::HttpStatus {
                status,
                body: error_body("delete failed"),
            });
        }

        let before = inner.instances.len();
        inner.instances.retain(|i| i.id != id);
        if inner.instances.len() == before {
            return Err(EngineError::HttpStatus {
                status: 404,
                body: error_body(&format!("Process instance with id {id} does not exist")),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(v: Value) -> Condition {
        v.as_object().cloned().unwrap()
    }

    fn fixture() -> MemoryProcessEngine {
        MemoryProcessEngine::with_instances([
            ProcessInstance::new("A")
                .with_definition("invoice")
                .with_business_key("order-1")
                .with_state("COMPLETED"),
            ProcessInstance::new("B")
                .with_definition("invoice")
                .with_business_key("keep-2")
                .with_state("ACTIVE"),
            ProcessInstance::new("C").with_definition("review"),
        ])
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("keep-%", "keep-2"));
        assert!(like_match("%-2", "keep-2"));
        assert!(like_match("%ee%", "keep-2"));
        assert!(like_match("%", ""));
        assert!(like_match("exact", "exact"));
        assert!(!like_match("exact", "exactly"));
        assert!(!like_match("a%a", "a"));
        assert!(!like_match("keep-%", "order-1"));
    }

    #[tokio::test]
    async fn test_query_filters() {
        let engine = fixture();
        let ids = engine
            .find_instance_ids(&condition(json!({"processDefinitionKey": "invoice"})))
            .await
            .unwrap();
        assert_eq!(ids, vec!["A", "B"]);

        let ids = engine
            .find_instance_ids(&condition(json!({"businessKeyLike": "keep-%"})))
            .await
            .unwrap();
        assert_eq!(ids, vec!["B"]);

        let ids = engine
            .find_instance_ids(&condition(json!({"processInstanceIds": ["C", "A"]})))
            .await
            .unwrap();
        assert_eq!(ids, vec!["A", "C"]);

        let ids = engine
            .find_instance_ids(&condition(
                json!({"processDefinitionKey": "invoice", "state": "ACTIVE"}),
            ))
            .await
            .unwrap();
        assert_eq!(ids, vec!["B"]);
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let engine = fixture();
        let cond = condition(json!({"processDefinitionKey": "invoice"}));
        engine.fail_query(cond.clone(), 500).await;
        engine.fail_delete("A", 500).await;
        engine.set_healthy(false).await;

        assert!(engine.health().await.is_err());
        assert_eq!(engine.find_instance_ids(&cond).await.unwrap_err().status(), Some(500));
        assert_eq!(engine.delete_instance("A").await.unwrap_err().status(), Some(500));
        assert_eq!(engine.remaining_ids().await, vec!["A", "B", "C"]);
    }

    #[tokio::test]
    async fn test_delete_removes_and_records() {
        let engine = fixture();
        engine.delete_instance("B").await.unwrap();
        assert_eq!(engine.delete_instance("B").await.unwrap_err().status(), Some(404));
        assert_eq!(engine.remaining_ids().await, vec!["A", "C"]);
        assert_eq!(engine.deleted_ids().await, vec!["B", "B"]);
        assert_eq!(
            engine.calls().await,
            vec![EngineCall::Delete("B".into()), EngineCall::Delete("B".into())]
        );
    }
}
