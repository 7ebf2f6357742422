//! Tempo estimators.
//!
//! Both estimators are plain state machines driven by explicit timestamps
//! (seconds on a monotonic clock). Neither blocks or performs I/O.

pub mod motion;
pub mod pattern;

pub use motion::MotionEstimator;
pub use pattern::PatternEstimator;

use std::collections::VecDeque;

/// Push onto a bounded FIFO, evicting the oldest entry on overflow.
pub(crate) fn push_bounded<T>(buf: &mut VecDeque<T>, value: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while buf.len() >= capacity {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// Arithmetic mean, `None` when empty.
pub(crate) fn mean(values: &VecDeque<f64>) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
