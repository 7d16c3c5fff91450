//! Routing configuration

use serde::{Deserialize, Serialize};

use crate::core::types::GatewayError;

/// How targets are chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyMode {
    /// Exactly one target
    Single,
    /// Targets tried in declared order; a target's retries are exhausted
    /// before moving on
    Fallback,
    /// Initial target drawn proportionally to weight, remaining targets
    /// tried weight-descending
    LoadBalance,
}

/// Strategy block of the routing config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Selection mode
    pub mode: StrategyMode,
}

/// Per-target retry policy; attempts counts the total tries on the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts on this target before the strategy moves on
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

fn default_attempts() -> u32 {
    1
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
        }
    }
}

/// One routing target: a registered provider name (the "virtual key"),
/// an optional weight, and a retry policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    /// Name of a registered provider
    #[serde(alias = "virtual_key")]
    pub provider: String,
    /// Relative weight; required for load-balance mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Retry policy for this target
    #[serde(default)]
    pub retry: RetryPolicy,
}

impl Target {
    /// Target for a provider with default retry policy
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            weight: None,
            retry: RetryPolicy::default(),
        }
    }

    /// Set the load-balance weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Set total attempts on this target
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.retry = RetryPolicy { attempts };
        self
    }
}

/// Routing configuration: a strategy and its targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Selection strategy
    pub strategy: StrategyConfig,
    /// Targets, in declaration order
    pub targets: Vec<Target>,
}

impl RouterConfig {
    /// Single-target config
    pub fn single(target: Target) -> Self {
        Self {
            strategy: StrategyConfig {
                mode: StrategyMode::Single,
            },
            targets: vec![target],
        }
    }

    /// Ordered-fallback config
    pub fn fallback(targets: Vec<Target>) -> Self {
        Self {
            strategy: StrategyConfig {
                mode: StrategyMode::Fallback,
            },
            targets,
        }
    }

    /// Weighted load-balance config
    pub fn load_balance(targets: Vec<Target>) -> Self {
        Self {
            strategy: StrategyConfig {
                mode: StrategyMode::LoadBalance,
            },
            targets,
        }
    }

    /// Check the mode's structural invariants. Pure; runs once at router
    /// construction.
    pub fn validate(&self) -> Result<(), GatewayError> {
        match self.strategy.mode {
            StrategyMode::Single => {
                if self.targets.len() != 1 {
                    return Err(GatewayError::configuration(
                        "single strategy requires exactly one target",
                    ));
                }
            }
            StrategyMode::Fallback => {
                if self.targets.is_empty() {
                    return Err(GatewayError::configuration(
                        "fallback strategy requires at least one target",
                    ));
                }
            }
            StrategyMode::LoadBalance => {
                if self.targets.len() < 2 {
                    return Err(GatewayError::configuration(
                        "load_balance strategy requires at least two targets",
                    ));
                }
                let mut total = 0.0;
                for target in &self.targets {
                    match target.weight {
                        Some(weight) if weight >= 0.0 => total += weight,
                        Some(_) => {
                            return Err(GatewayError::configuration(format!(
                                "target '{}' has a negative weight",
                                target.provider
                            )));
                        }
                        None => {
                            return Err(GatewayError::configuration(format!(
                                "target '{}' needs a weight for load_balance",
                                target.provider
                            )));
                        }
                    }
                }
                if total <= 0.0 {
                    return Err(GatewayError::configuration(
                        "load_balance weights must sum to a positive total",
                    ));
                }
            }
        }
        Ok(())
    }
}
