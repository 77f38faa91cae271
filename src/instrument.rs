//! Per-node call counting and optional input/output history
//!
//! A node owns one `Instrumentation`; every parent holding the node observes
//! the same counter and logs. Only the node's own entry points record into it.

use crate::linalg::{Point, Sample};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Monotonic call counter
#[derive(Debug, Default)]
pub struct CallCounter(AtomicU64);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&self) {
        self.add(1);
    }

    pub fn add(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct HistoryLog {
    inputs: Sample,
    outputs: Sample,
}

/// Append-only input/output logs, active only while enabled.
///
/// Both logs sit behind a single lock so an input and its output are always
/// appended together, and a batch is appended contiguously in row order.
#[derive(Debug)]
pub struct CallHistory {
    enabled: AtomicBool,
    log: Mutex<HistoryLog>,
}

impl CallHistory {
    pub fn new(input_dimension: usize, output_dimension: usize) -> Self {
        CallHistory {
            enabled: AtomicBool::new(false),
            log: Mutex::new(HistoryLog {
                inputs: Sample::empty(input_dimension),
                outputs: Sample::empty(output_dimension),
            }),
        }
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        let mut log = self.log.lock();
        let (din, dout) = (log.inputs.dimension(), log.outputs.dimension());
        log.inputs = Sample::empty(din);
        log.outputs = Sample::empty(dout);
    }

    fn store(&self, input: &[f64], output: &[f64]) {
        if !self.is_enabled() {
            return;
        }
        let mut log = self.log.lock();
        log.inputs.push(input);
        log.outputs.push(output);
    }

    fn store_sample(&self, inputs: &Sample, outputs: &Sample) {
        if !self.is_enabled() {
            return;
        }
        let mut log = self.log.lock();
        log.inputs.append(inputs);
        log.outputs.append(outputs);
    }

    pub fn inputs(&self) -> Sample {
        self.log.lock().inputs.clone()
    }

    pub fn outputs(&self) -> Sample {
        self.log.lock().outputs.clone()
    }
}

/// Counter plus history for one evaluation node
#[derive(Debug)]
pub struct Instrumentation {
    calls: CallCounter,
    history: CallHistory,
}

impl Instrumentation {
    pub fn new(input_dimension: usize, output_dimension: usize) -> Self {
        Instrumentation {
            calls: CallCounter::new(),
            history: CallHistory::new(input_dimension, output_dimension),
        }
    }

    /// Record one successful point evaluation
    pub fn record(&self, input: &Point, output: &Point) {
        self.calls.increment();
        self.history.store(input, output);
    }

    /// Record one successful batch evaluation (`inputs.size()` calls)
    pub fn record_sample(&self, inputs: &Sample, outputs: &Sample) {
        self.calls.add(inputs.size() as u64);
        self.history.store_sample(inputs, outputs);
    }

    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    pub fn history(&self) -> &CallHistory {
        &self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_history_only_when_enabled() {
        let inst = Instrumentation::new(1, 1);
        inst.record(&Point::from([1.0]), &Point::from([2.0]));
        assert_eq!(inst.calls(), 1);
        assert_eq!(inst.history().inputs().size(), 0);

        inst.history().enable();
        inst.record(&Point::from([3.0]), &Point::from([4.0]));
        assert_eq!(inst.calls(), 2);
        assert_eq!(inst.history().inputs().point(0), Point::from([3.0]));
        assert_eq!(inst.history().outputs().point(0), Point::from([4.0]));

        inst.history().clear();
        assert_eq!(inst.history().inputs().size(), 0);
        assert_eq!(inst.calls(), 2);
    }

    #[test]
    fn test_concurrent_counting() {
        let inst = Arc::new(Instrumentation::new(1, 1));
        inst.history().enable();
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let inst = Arc::clone(&inst);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let v = (t * 100 + i) as f64;
                        inst.record(&Point::from([v]), &Point::from([2.0 * v]));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(inst.calls(), 400);
        let (ins, outs) = (inst.history().inputs(), inst.history().outputs());
        assert_eq!(ins.size(), 400);
        // pairs stay aligned under contention
        for i in 0..ins.size() {
            assert_eq!(outs.row(i)[0], 2.0 * ins.row(i)[0]);
        }
    }
}
