//! Scheduler configuration loading from environment variables.
//!
//! All values are loaded from `DISPATCH_<CATEGORY>_*` environment variables
//! with per-category defaults. Invalid values fall back to defaults without
//! crashing.
//!
//! # Environment Variables (per category, e.g. `COACH_CHAT`)
//!
//! | Variable | Description |
//! |---|---|
//! | `DISPATCH_<CATEGORY>_POOL_SIZE` | Max concurrent handler calls |
//! | `DISPATCH_<CATEGORY>_PACING_MS` | Min interval between dispatches (ms) |
//! | `DISPATCH_<CATEGORY>_QUEUE_DEPTH` | Max pending requests |
//! | `DISPATCH_<CATEGORY>_MAX_RETRIES` | Max recoverable-failure retries |
//! | `DISPATCH_<CATEGORY>_TIMEOUT_MS` | Per-dispatch watchdog (0 = off) |

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::category::{Category, CategoryConfig};

/// Full scheduler configuration: one registry entry per category.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub plan_generation: CategoryConfig,
    pub coach_chat: CategoryConfig,
    pub food_analysis: CategoryConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            plan_generation: CategoryConfig::default_for(Category::PlanGeneration),
            coach_chat: CategoryConfig::default_for(Category::CoachChat),
            food_analysis: CategoryConfig::default_for(Category::FoodAnalysis),
        }
    }
}

impl SchedulerConfig {
    /// Registry entry for one category.
    pub fn category(&self, category: Category) -> &CategoryConfig {
        match category {
            Category::PlanGeneration => &self.plan_generation,
            Category::CoachChat => &self.coach_chat,
            Category::FoodAnalysis => &self.food_analysis,
        }
    }

    /// Mutable registry entry, for programmatic overrides before start.
    pub fn category_mut(&mut self, category: Category) -> &mut CategoryConfig {
        match category {
            Category::PlanGeneration => &mut self.plan_generation,
            Category::CoachChat => &mut self.coach_chat,
            Category::FoodAnalysis => &mut self.food_analysis,
        }
    }

    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> Vec<EffectiveCategoryConfig> {
        Category::ALL
            .iter()
            .map(|&cat| {
                let cfg = self.category(cat);
                EffectiveCategoryConfig {
                    category: cat,
                    pool_size: cfg.pool_size,
                    pacing_ms: cfg.pacing_delay.as_millis() as u64,
                    max_queue_depth: cfg.max_queue_depth,
                    max_retries: cfg.max_retries,
                    dispatch_timeout_ms: cfg
                        .dispatch_timeout
                        .map(|d| d.as_millis() as u64),
                }
            })
            .collect()
    }
}

/// Effective per-category configuration summary (serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveCategoryConfig {
    pub category: Category,
    pub pool_size: usize,
    pub pacing_ms: u64,
    pub max_queue_depth: usize,
    pub max_retries: u32,
    pub dispatch_timeout_ms: Option<u64>,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u32` env var, returning `default` on missing or invalid.
fn parse_u32(key: &str, default: u32) -> u32 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u32>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_key(category: Category, suffix: &str) -> String {
    format!(
        "DISPATCH_{}_{suffix}",
        category.as_str().to_ascii_uppercase()
    )
}

/// Load one category's configuration from environment.
fn load_category(category: Category) -> CategoryConfig {
    let defaults = CategoryConfig::default_for(category);

    let pool_size = parse_usize(&env_key(category, "POOL_SIZE"), defaults.pool_size).max(1);
    let pacing_ms = parse_u64(
        &env_key(category, "PACING_MS"),
        defaults.pacing_delay.as_millis() as u64,
    );
    let max_queue_depth =
        parse_usize(&env_key(category, "QUEUE_DEPTH"), defaults.max_queue_depth).max(1);
    let max_retries = parse_u32(&env_key(category, "MAX_RETRIES"), defaults.max_retries);
    let timeout_ms = parse_u64(
        &env_key(category, "TIMEOUT_MS"),
        defaults
            .dispatch_timeout
            .map_or(0, |d| d.as_millis() as u64),
    );

    CategoryConfig {
        pool_size,
        pacing_delay: Duration::from_millis(pacing_ms),
        max_queue_depth,
        max_retries,
        dispatch_timeout: (timeout_ms > 0).then(|| Duration::from_millis(timeout_ms)),
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to per-category defaults without
/// panicking.
pub fn load() -> SchedulerConfig {
    SchedulerConfig {
        plan_generation: load_category(Category::PlanGeneration),
        coach_chat: load_category(Category::CoachChat),
        food_analysis: load_category(Category::FoodAnalysis),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize env-mutating tests to avoid cross-test pollution.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const SUFFIXES: &[&str] = &[
        "POOL_SIZE",
        "PACING_MS",
        "QUEUE_DEPTH",
        "MAX_RETRIES",
        "TIMEOUT_MS",
    ];

    fn clear_env_vars() {
        for cat in Category::ALL {
            for suffix in SUFFIXES {
                std::env::remove_var(env_key(cat, suffix));
            }
        }
    }

    #[test]
    fn defaults_are_sensible() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let cfg = load();
        assert_eq!(cfg.coach_chat.pool_size, 8);
        assert_eq!(cfg.coach_chat.pacing_delay.as_millis(), 100);
        assert_eq!(cfg.plan_generation.pool_size, 2);
        assert_eq!(cfg.food_analysis.max_queue_depth, 50);
        assert!(cfg.coach_chat.dispatch_timeout.is_none());
    }

    #[test]
    fn env_vars_override_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("DISPATCH_COACH_CHAT_POOL_SIZE", "16");
        std::env::set_var("DISPATCH_COACH_CHAT_PACING_MS", "25");
        std::env::set_var("DISPATCH_FOOD_ANALYSIS_TIMEOUT_MS", "30000");
        let cfg = load();
        assert_eq!(cfg.coach_chat.pool_size, 16);
        assert_eq!(cfg.coach_chat.pacing_delay.as_millis(), 25);
        assert_eq!(
            cfg.food_analysis.dispatch_timeout,
            Some(Duration::from_millis(30000))
        );
        // Untouched categories keep defaults.
        assert_eq!(cfg.plan_generation.pool_size, 2);
        clear_env_vars();
    }

    #[test]
    fn invalid_env_falls_back_to_default() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("DISPATCH_COACH_CHAT_POOL_SIZE", "not_a_number");
        std::env::set_var("DISPATCH_PLAN_GENERATION_QUEUE_DEPTH", "-5");
        let cfg = load();
        assert_eq!(cfg.coach_chat.pool_size, 8);
        assert_eq!(cfg.plan_generation.max_queue_depth, 32);
        clear_env_vars();
    }

    #[test]
    fn zero_values_are_floored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        std::env::set_var("DISPATCH_COACH_CHAT_POOL_SIZE", "0");
        std::env::set_var("DISPATCH_COACH_CHAT_QUEUE_DEPTH", "0");
        let cfg = load();
        assert!(cfg.coach_chat.pool_size >= 1);
        assert!(cfg.coach_chat.max_queue_depth >= 1);
        clear_env_vars();
    }

    #[test]
    fn effective_config_covers_every_category() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env_vars();
        let summary = load().effective_config();
        assert_eq!(summary.len(), Category::ALL.len());
        for entry in summary {
            assert!(entry.pool_size >= 1);
            assert!(entry.max_queue_depth >= 1);
        }
    }
}
