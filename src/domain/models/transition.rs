//! Transition request and state models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier assigned to each transition when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse classification of how demanding the submitted response is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    #[default]
    Medium,
    High,
}

impl Complexity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl FromStr for Complexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("Invalid complexity: {other}. Must be one of: low, medium, high")),
        }
    }
}

impl std::fmt::Display for Complexity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse classification of the client's network quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkCondition {
    Fast,
    #[default]
    Normal,
    Slow,
}

impl NetworkCondition {
    /// Round-trip below which a link counts as fast.
    pub const FAST_THRESHOLD_MS: u64 = 100;
    /// Round-trip above which a link counts as slow.
    pub const SLOW_THRESHOLD_MS: u64 = 300;

    /// Classify an average round-trip latency.
    pub const fn from_latency_ms(latency_ms: u64) -> Self {
        if latency_ms < Self::FAST_THRESHOLD_MS {
            Self::Fast
        } else if latency_ms <= Self::SLOW_THRESHOLD_MS {
            Self::Normal
        } else {
            Self::Slow
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Normal => "normal",
            Self::Slow => "slow",
        }
    }
}

impl FromStr for NetworkCondition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "normal" => Ok(Self::Normal),
            "slow" => Ok(Self::Slow),
            other => Err(format!("Invalid network condition: {other}. Must be one of: fast, normal, slow")),
        }
    }
}

impl std::fmt::Display for NetworkCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Everything the orchestrator knows about one submitted response.
///
/// Built by the caller and passed by value; the orchestrator never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransitionContext {
    pub session_id: String,
    pub stage_id: String,
    pub question_id: String,
    pub response_id: String,
    /// Size of the submitted response (characters).
    pub response_length: u64,
    pub complexity: Complexity,
    pub network_condition: NetworkCondition,
    pub priority: Priority,
}

impl TransitionContext {
    pub fn new(session_id: impl Into<String>, question_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            question_id: question_id.into(),
            ..Default::default()
        }
    }

    pub fn with_stage(mut self, stage_id: impl Into<String>) -> Self {
        self.stage_id = stage_id.into();
        self
    }

    pub fn with_response(mut self, response_id: impl Into<String>, length: u64) -> Self {
        self.response_id = response_id.into();
        self.response_length = length;
        self
    }

    pub const fn with_complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub const fn with_network(mut self, network_condition: NetworkCondition) -> Self {
        self.network_condition = network_condition;
        self
    }

    pub const fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Phase of the transition state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    #[default]
    Idle,
    Analyzing,
    Waiting,
    Transitioning,
    Complete,
}

impl TransitionPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Analyzing => "analyzing",
            Self::Waiting => "waiting",
            Self::Transitioning => "transitioning",
            Self::Complete => "complete",
        }
    }
}

impl std::fmt::Display for TransitionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single observable state slot owned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransitionState {
    pub phase: TransitionPhase,
    pub remaining_delay_ms: u64,
    /// 0-100, never decreases within one transition.
    pub progress: f64,
    pub estimated_completion: Option<DateTime<Utc>>,
    pub request_id: Option<RequestId>,
    pub context: Option<TransitionContext>,
}

impl TransitionState {
    pub fn idle() -> Self {
        Self::default()
    }

    /// A transition owns the slot in every phase except idle.
    pub fn is_active(&self) -> bool {
        self.phase != TransitionPhase::Idle
    }
}
