//! Randomized liveness challenges.
//!
//! A challenge names one facial action and a short deadline. The verifier
//! checks the client's report against timing and confidence floors, the
//! attempt ledger makes every challenge single-use (replay protection), and
//! the sliding-window counter rate-limits issuance per user.

pub mod challenge;
pub mod error;
pub mod ledger;
pub mod ratelimit;
pub mod verify;

pub use challenge::{Challenge, ChallengeIssuer, ChallengeType};
pub use error::{LivenessError, LivenessResult};
pub use ledger::{AttemptLedger, ChallengeAttempt, InMemoryAttemptLedger};
pub use ratelimit::SlidingWindowCounter;
pub use verify::{composite_liveness_score, ChallengeResponse, LivenessOutcome, LivenessVerifier};
