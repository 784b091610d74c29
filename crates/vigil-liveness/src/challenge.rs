use rand::Rng;
use serde::{Deserialize, Serialize};

use vigil_core::{ChallengeId, Timestamp};

pub const MIN_TIME_LIMIT_SECONDS: u32 = 5;
pub const MAX_TIME_LIMIT_SECONDS: u32 = 8;

// ---------------------------------------------------------------------------
// ChallengeType — the six facial actions a client can be asked to perform
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeType {
    BlinkEyes,
    TurnHeadLeft,
    TurnHeadRight,
    Smile,
    RaiseEyebrows,
    FollowDot,
}

impl ChallengeType {
    pub const ALL: [ChallengeType; 6] = [
        ChallengeType::BlinkEyes,
        ChallengeType::TurnHeadLeft,
        ChallengeType::TurnHeadRight,
        ChallengeType::Smile,
        ChallengeType::RaiseEyebrows,
        ChallengeType::FollowDot,
    ];

    /// Wire name, also the prefix of generated challenge ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeType::BlinkEyes => "BLINK_EYES",
            ChallengeType::TurnHeadLeft => "TURN_HEAD_LEFT",
            ChallengeType::TurnHeadRight => "TURN_HEAD_RIGHT",
            ChallengeType::Smile => "SMILE",
            ChallengeType::RaiseEyebrows => "RAISE_EYEBROWS",
            ChallengeType::FollowDot => "FOLLOW_DOT",
        }
    }

    /// Instruction text clients display verbatim.
    pub fn instruction(&self) -> &'static str {
        match self {
            ChallengeType::BlinkEyes => "Blink Your Eyes",
            ChallengeType::TurnHeadLeft => "Turn Your Head Left",
            ChallengeType::TurnHeadRight => "Turn Your Head Right",
            ChallengeType::Smile => "Smile",
            ChallengeType::RaiseEyebrows => "Raise Your Eyebrows",
            ChallengeType::FollowDot => "Follow the Moving Dot with Your Eyes",
        }
    }
}

impl std::fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Challenge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub challenge_id: ChallengeId,
    pub challenge_type: ChallengeType,
    pub instruction: String,
    pub time_limit_seconds: u32,
    pub issued_at: Timestamp,
}

// ---------------------------------------------------------------------------
// ChallengeIssuer
// ---------------------------------------------------------------------------

/// Generates challenges with a uniformly random type and a 5–8 second time
/// limit. The id embeds the type and issue time in milliseconds, so two
/// challenges issued in the same millisecond for the same type collide;
/// the attempt ledger treats that as the same challenge, which is safe.
#[derive(Debug, Clone, Default)]
pub struct ChallengeIssuer;

impl ChallengeIssuer {
    pub fn new() -> Self {
        Self
    }

    pub fn issue(&self) -> Challenge {
        self.issue_at(Timestamp::now())
    }

    pub fn issue_at(&self, now: Timestamp) -> Challenge {
        let mut rng = rand::thread_rng();
        let challenge_type = ChallengeType::ALL[rng.gen_range(0..ChallengeType::ALL.len())];
        let time_limit_seconds = rng.gen_range(MIN_TIME_LIMIT_SECONDS..=MAX_TIME_LIMIT_SECONDS);
        let challenge_id =
            ChallengeId::new(format!("{}_{}", challenge_type.as_str(), now.as_millis()));

        tracing::debug!(
            challenge_id = %challenge_id,
            challenge_type = %challenge_type,
            time_limit_seconds,
            "liveness challenge issued"
        );

        Challenge {
            challenge_id,
            challenge_type,
            instruction: challenge_type.instruction().to_string(),
            time_limit_seconds,
            issued_at: now,
        }
    }
}
