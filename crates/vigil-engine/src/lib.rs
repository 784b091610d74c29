//! Rule-based threat scoring.
//!
//! The engine is a pure function from (session binding, current signals,
//! external ML anomaly score) to an explainable 0–100 score with a fixed
//! per-rule breakdown, an ordered trigger list, and a recommended action.
//! It holds no mutable state and never errors on malformed signal input:
//! an unparsable IP degrades to the drift sub-score, it does not raise.

pub mod engine;
pub mod rules;
pub mod signals;

pub use engine::{ThreatAssessment, ThreatScoringEngine};
pub use signals::{HeartbeatSignals, SessionBinding};
