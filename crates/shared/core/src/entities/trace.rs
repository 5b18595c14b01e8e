use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Values returned by each metric function during one evaluation
///
/// Keyed by the function name as written in formulas (`price`, `stdev`, ...).
/// Debugging and explainability only, never consulted for correctness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvaluationTrace {
    values: BTreeMap<String, Vec<f64>>,
}

impl EvaluationTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a returned value under the function's name
    pub fn record(&mut self, function: &str, value: f64) {
        self.values
            .entry(function.to_string())
            .or_default()
            .push(value);
    }

    /// Values recorded for a function, in call order
    pub fn get(&self, function: &str) -> Option<&[f64]> {
        self.values.get(function).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total number of recorded calls
    pub fn call_count(&self) -> usize {
        self.values.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_preserves_order() {
        let mut trace = EvaluationTrace::new();
        trace.record("price", 150.0);
        trace.record("stdev", 0.2);
        trace.record("price", 140.0);

        assert_eq!(trace.get("price"), Some(&[150.0, 140.0][..]));
        assert_eq!(trace.get("stdev"), Some(&[0.2][..]));
        assert_eq!(trace.get("marketCap"), None);
        assert_eq!(trace.call_count(), 3);
    }

    #[test]
    fn test_serializes_as_map() {
        let mut trace = EvaluationTrace::new();
        trace.record("price", 150.0);
        assert_eq!(serde_json::to_string(&trace).unwrap(), r#"{"price":[150.0]}"#);
    }
}
