use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::performance::error::{invalid_argument, PerformanceResult};

/// Records manual traces in memory.
///
/// Each trace is keyed by its name; stopping a trace replaces any earlier
/// recording with the same name.
#[derive(Clone, Default)]
pub struct Performance {
    inner: Arc<PerformanceInner>,
}

#[derive(Default)]
struct PerformanceInner {
    traces: Mutex<HashMap<String, PerformanceTrace>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PerformanceTrace {
    pub name: String,
    pub duration: Duration,
    pub metrics: HashMap<String, i64>,
}

#[derive(Clone)]
pub struct TraceHandle {
    performance: Performance,
    name: String,
    start: Instant,
    metrics: HashMap<String, i64>,
}

impl Performance {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new manual trace.
    pub fn new_trace(&self, name: &str) -> PerformanceResult<TraceHandle> {
        if name.trim().is_empty() {
            return Err(invalid_argument("Trace name must not be empty"));
        }
        Ok(TraceHandle {
            performance: self.clone(),
            name: name.to_string(),
            start: Instant::now(),
            metrics: HashMap::new(),
        })
    }

    /// Returns the most recently recorded trace with `name`, if any.
    pub fn recorded_trace(&self, name: &str) -> Option<PerformanceTrace> {
        self.inner.traces.lock().unwrap().get(name).cloned()
    }
}

impl fmt::Debug for Performance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let traces = self.inner.traces.lock().unwrap();
        f.debug_struct("Performance")
            .field("recorded", &traces.len())
            .finish()
    }
}

impl TraceHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds (or replaces) a numeric metric for the trace.
    pub fn put_metric(&mut self, name: &str, value: i64) -> PerformanceResult<()> {
        if name.trim().is_empty() {
            return Err(invalid_argument("Metric name must not be empty"));
        }
        self.metrics.insert(name.to_string(), value);
        Ok(())
    }

    /// Stops the trace and stores the timing/metrics in the parent [`Performance`] instance.
    pub fn stop(self) -> PerformanceTrace {
        let trace = PerformanceTrace {
            name: self.name.clone(),
            duration: self.start.elapsed(),
            metrics: self.metrics,
        };
        self.performance
            .inner
            .traces
            .lock()
            .unwrap()
            .insert(self.name, trace.clone());
        trace
    }
}

impl fmt::Debug for TraceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceHandle")
            .field("name", &self.name)
            .field("elapsed", &self.start.elapsed())
            .finish()
    }
}
