//! Common types used across trainwatch modules.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Identifier of a broadcast subscriber (a chat id on the transport).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(pub i64);

impl SubscriberId {
    /// Create a new subscriber id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw id.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for SubscriberId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Metrics produced by the training loop for a single epoch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    values: HashMap<String, f64>,
}

impl MetricsSnapshot {
    /// Create an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric value.
    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.values.insert(name.to_string(), value);
        self
    }

    /// Set a metric value in place.
    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    /// Get a metric value.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Render a metric for display, `n/a` when absent.
    pub fn display(&self, name: &str) -> String {
        match self.get(name) {
            Some(v) => v.to_string(),
            None => "n/a".to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, f64)> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscriber_id_display() {
        assert_eq!(SubscriberId::new(-1001).to_string(), "-1001");
        assert_eq!(SubscriberId::from(42).as_i64(), 42);
    }

    #[test]
    fn test_subscriber_id_serde_transparent() {
        let json = serde_json::to_string(&SubscriberId::new(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_metrics_display() {
        let metrics = MetricsSnapshot::new().with_metric("loss", 0.5);
        assert_eq!(metrics.display("loss"), "0.5");
        assert_eq!(metrics.display("regression_loss"), "n/a");
        assert_eq!(metrics.len(), 1);
    }

    #[test]
    fn test_metrics_from_iter() {
        let metrics: MetricsSnapshot = vec![("loss".to_string(), 1.25)].into_iter().collect();
        assert_eq!(metrics.get("loss"), Some(1.25));
        assert!(!metrics.is_empty());
    }
}
