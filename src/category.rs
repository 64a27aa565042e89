//! Work categories and their registry entries.
//!
//! Each category owns an independent worker pool, pacing delay, queue depth,
//! and retry ceiling. Categories are fixed at compile time; the behavior of a
//! category is swapped by registering a different handler, not by editing
//! this enum.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A named class of AI work sharing one worker pool and retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Multi-week training/nutrition plan generation. Slow, low volume.
    PlanGeneration,
    /// Conversational coaching. Fast, latency-sensitive.
    CoachChat,
    /// Image-based food analysis. Medium latency, bursty.
    FoodAnalysis,
}

impl Category {
    /// All categories, in scheduling-independent order.
    pub const ALL: [Category; 3] = [
        Category::PlanGeneration,
        Category::CoachChat,
        Category::FoodAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlanGeneration => "plan_generation",
            Self::CoachChat => "coach_chat",
            Self::FoodAnalysis => "food_analysis",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plan_generation" => Ok(Self::PlanGeneration),
            "coach_chat" => Ok(Self::CoachChat),
            "food_analysis" => Ok(Self::FoodAnalysis),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Error for unrecognized category names.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

/// Registry entry for one category.
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    /// Maximum concurrent in-flight handler calls.
    pub pool_size: usize,
    /// Minimum interval between successive dispatch starts, independent of
    /// pool size. Approximates the upstream rate limit.
    pub pacing_delay: Duration,
    /// Maximum pending requests before `QueueFull` rejection.
    pub max_queue_depth: usize,
    /// Maximum recoverable-failure retries per request.
    pub max_retries: u32,
    /// Optional watchdog: a handler call exceeding this is treated as a
    /// recoverable failure. Off by default; the handler is trusted to fail
    /// within bounded time.
    pub dispatch_timeout: Option<Duration>,
}

impl CategoryConfig {
    /// Default registry entry for a category, reflecting its workload shape.
    pub fn default_for(category: Category) -> Self {
        match category {
            Category::PlanGeneration => Self {
                pool_size: 2,
                pacing_delay: Duration::from_millis(500),
                max_queue_depth: 32,
                max_retries: 3,
                dispatch_timeout: None,
            },
            Category::CoachChat => Self {
                pool_size: 8,
                pacing_delay: Duration::from_millis(100),
                max_queue_depth: 64,
                max_retries: 2,
                dispatch_timeout: None,
            },
            Category::FoodAnalysis => Self {
                pool_size: 4,
                pacing_delay: Duration::from_millis(250),
                max_queue_depth: 50,
                max_retries: 3,
                dispatch_timeout: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_round_trips_through_str() {
        for cat in Category::ALL {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
    }

    #[test]
    fn unknown_category_is_rejected() {
        assert!("meal_swap".parse::<Category>().is_err());
    }

    #[test]
    fn defaults_bound_every_category() {
        for cat in Category::ALL {
            let cfg = CategoryConfig::default_for(cat);
            assert!(cfg.pool_size >= 1);
            assert!(cfg.max_queue_depth >= 1);
        }
    }
}
