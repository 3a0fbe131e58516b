//! Engine configuration
//!
//! Loaded once from the environment at startup; passed read-only to the
//! Director and Actor on every turn.

use std::time::Duration;

/// Which Director variant is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectorMode {
    /// Rule-based, fully local
    #[default]
    Heuristic,
    /// Delegate classification to the external decision provider
    Delegated,
}

/// Engine-wide tuning knobs
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Roles the Director may select from
    pub roles: Vec<String>,
    /// Beats the Director may select from
    pub beats: Vec<String>,
    /// Role used by fallback plans
    pub default_role: String,
    /// Beat forced when the pacing rule fires
    pub output_beat: String,
    /// Output clock threshold (seconds) past which the next plan must
    /// produce output
    pub pacing_threshold_sec: i64,
    /// Talk-burst budget for a normal turn
    pub talk_burst_default_sec: u32,
    /// Reduced budget when cognitive load is elevated
    pub talk_burst_high_load_sec: u32,
    /// Cognitive load at or above which the reduced budget applies
    pub high_load_threshold: u8,
    /// Hard cap on assembled prompt length, in characters
    pub max_prompt_chars: usize,
    /// Timeout for any single provider call
    pub provider_timeout: Duration,
    /// Per-session cap on the idempotency map, oldest key evicted
    pub dedup_cap: usize,
    pub director_mode: DirectorMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            roles: vec![
                "host".to_string(),
                "expert".to_string(),
                "skeptic".to_string(),
            ],
            beats: vec![
                "Hook".to_string(),
                "Check".to_string(),
                "Reveal".to_string(),
                "Stretch".to_string(),
                "Recap".to_string(),
            ],
            default_role: "host".to_string(),
            output_beat: "Reveal".to_string(),
            pacing_threshold_sec: 45,
            talk_burst_default_sec: 40,
            talk_burst_high_load_sec: 20,
            high_load_threshold: 3,
            max_prompt_chars: 6000,
            provider_timeout: Duration::from_secs(20),
            dedup_cap: 4096,
            director_mode: DirectorMode::Heuristic,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            roles: env_list("MAIEUTIC_ROLES").unwrap_or(base.roles),
            beats: env_list("MAIEUTIC_BEATS").unwrap_or(base.beats),
            default_role: std::env::var("MAIEUTIC_DEFAULT_ROLE").unwrap_or(base.default_role),
            output_beat: std::env::var("MAIEUTIC_OUTPUT_BEAT").unwrap_or(base.output_beat),
            pacing_threshold_sec: env_parse("MAIEUTIC_PACING_THRESHOLD_SEC")
                .unwrap_or(base.pacing_threshold_sec),
            talk_burst_default_sec: env_parse("MAIEUTIC_TALK_BURST_SEC")
                .unwrap_or(base.talk_burst_default_sec),
            talk_burst_high_load_sec: env_parse("MAIEUTIC_TALK_BURST_HIGH_LOAD_SEC")
                .unwrap_or(base.talk_burst_high_load_sec),
            high_load_threshold: env_parse("MAIEUTIC_HIGH_LOAD_THRESHOLD")
                .unwrap_or(base.high_load_threshold),
            max_prompt_chars: env_parse("MAIEUTIC_MAX_PROMPT_CHARS")
                .unwrap_or(base.max_prompt_chars),
            provider_timeout: env_parse("MAIEUTIC_PROVIDER_TIMEOUT_SEC")
                .map_or(base.provider_timeout, Duration::from_secs),
            dedup_cap: env_parse("MAIEUTIC_DEDUP_CAP").unwrap_or(base.dedup_cap),
            director_mode: match std::env::var("MAIEUTIC_DIRECTOR").as_deref() {
                Ok("delegated") => DirectorMode::Delegated,
                _ => DirectorMode::Heuristic,
            },
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    let raw = std::env::var(key).ok()?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let cfg = EngineConfig::default();
        assert!(cfg.roles.contains(&cfg.default_role));
        assert!(cfg.beats.contains(&cfg.output_beat));
        assert!(cfg.talk_burst_high_load_sec < cfg.talk_burst_default_sec);
        assert!(cfg.pacing_threshold_sec > 0);
    }
}
