use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationMilliSeconds};
use std::{str::FromStr, time::Duration};

use crate::models::{Craft, Difficulty};

pub const DEMO_KEY: &str = "DEMO_KEY";

/// Cast-on / foundation counts for the two difficulty buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPair {
    pub beginner: u32,
    pub full: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchCounts {
    pub knitting: CountPair,
    pub crochet: CountPair,
}

impl Default for StitchCounts {
    fn default() -> Self {
        Self {
            knitting: CountPair { beginner: 30, full: 55 },
            crochet: CountPair { beginner: 20, full: 40 },
        }
    }
}

impl StitchCounts {
    pub fn for_request(&self, craft: Craft, difficulty: Difficulty) -> u32 {
        let pair = match craft {
            Craft::Knitting => self.knitting,
            Craft::Crochet => self.crochet,
        };
        match difficulty {
            Difficulty::Beginner => pair.beginner,
            Difficulty::Intermediate | Difficulty::Advanced => pair.full,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (craft, pair) in [(Craft::Knitting, self.knitting), (Craft::Crochet, self.crochet)] {
            if pair.beginner == 0 || pair.beginner >= pair.full {
                bail!("{craft} counts must satisfy 0 < beginner < full (got {} / {})", pair.beginner, pair.full);
            }
        }
        Ok(())
    }
}

/// Artificial wait before a template result is returned.
#[serde_as]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Latency {
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub base: Duration,
    #[serde_as(as = "DurationMilliSeconds<u64>")]
    pub jitter: Duration,
}

impl Latency {
    pub fn none() -> Self { Self::default() }

    pub fn is_zero(&self) -> bool { self.base.is_zero() && self.jitter.is_zero() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Template,
    Gemini,
}

impl FromStr for Backend {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "template" => Ok(Backend::Template),
            "gemini" => Ok(Backend::Gemini),
            other => bail!("unknown PATTERN_BACKEND '{other}' (expected template or gemini)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub backend: Backend,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub gemini_timeout: Duration,
    pub public_base_url: String,
    pub latency: Latency,
    pub stitch_counts: StitchCounts,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            backend: Backend::Template,
            gemini_api_key: DEMO_KEY.to_string(),
            gemini_api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            gemini_timeout: Duration::from_secs(20),
            public_base_url: "http://localhost:8080".to_string(),
            latency: Latency { base: Duration::from_millis(800), jitter: Duration::ZERO },
            stitch_counts: StitchCounts::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(port) = parsed::<u16, _>(&lookup, "PORT")? { cfg.port = port; }
        if let Some(backend) = lookup("PATTERN_BACKEND") { cfg.backend = backend.parse()?; }
        if let Some(key) = lookup("GEMINI_API_KEY").map(|k| k.trim().to_string()).filter(|k| !k.is_empty()) {
            cfg.gemini_api_key = key;
        }
        if let Some(base) = lookup("GEMINI_API_BASE") { cfg.gemini_api_base = base.trim_end_matches('/').to_string(); }
        if let Some(ms) = parsed::<u64, _>(&lookup, "GEMINI_TIMEOUT_MS")? {
            if ms == 0 {
                bail!("GEMINI_TIMEOUT_MS must be greater than zero");
            }
            cfg.gemini_timeout = Duration::from_millis(ms);
        }
        if let Some(url) = lookup("PUBLIC_BASE_URL") { cfg.public_base_url = url.trim_end_matches('/').to_string(); }
        if let Some(ms) = parsed::<u64, _>(&lookup, "SIMULATED_LATENCY_MS")? { cfg.latency.base = Duration::from_millis(ms); }
        if let Some(ms) = parsed::<u64, _>(&lookup, "LATENCY_JITTER_MS")? { cfg.latency.jitter = Duration::from_millis(ms); }

        let counts = &mut cfg.stitch_counts;
        if let Some(n) = parsed::<u32, _>(&lookup, "KNIT_CAST_ON_BEGINNER")? { counts.knitting.beginner = n; }
        if let Some(n) = parsed::<u32, _>(&lookup, "KNIT_CAST_ON_FULL")? { counts.knitting.full = n; }
        if let Some(n) = parsed::<u32, _>(&lookup, "CROCHET_CHAIN_BEGINNER")? { counts.crochet.beginner = n; }
        if let Some(n) = parsed::<u32, _>(&lookup, "CROCHET_CHAIN_FULL")? { counts.crochet.full = n; }
        cfg.stitch_counts.validate()?;

        if cfg.backend == Backend::Gemini && cfg.gemini_api_key == DEMO_KEY {
            tracing::warn!("⚠️ PATTERN_BACKEND=gemini without GEMINI_API_KEY, template fallback will answer every request");
        }
        Ok(cfg)
    }

    pub fn has_gemini_key(&self) -> bool { self.gemini_api_key != DEMO_KEY }
}

fn parsed<T, F>(lookup: &F, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("invalid value for {key}: '{raw}'")))
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn cfg_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let env: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| env.get(k).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let cfg = cfg_from(&[]).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.backend, Backend::Template);
        assert!(!cfg.has_gemini_key());
        assert_eq!(cfg.stitch_counts, StitchCounts::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = cfg_from(&[
            ("PORT", "9000"),
            ("PATTERN_BACKEND", "Gemini"),
            ("GEMINI_API_KEY", "abc"),
            ("SIMULATED_LATENCY_MS", "0"),
            ("KNIT_CAST_ON_FULL", "60"),
            ("PUBLIC_BASE_URL", "https://soreg.example/"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.backend, Backend::Gemini);
        assert!(cfg.has_gemini_key());
        assert!(cfg.latency.is_zero());
        assert_eq!(cfg.stitch_counts.knitting.full, 60);
        assert_eq!(cfg.public_base_url, "https://soreg.example");
    }

    #[test]
    fn rejects_inverted_stitch_buckets() {
        let err = cfg_from(&[("CROCHET_CHAIN_BEGINNER", "40"), ("CROCHET_CHAIN_FULL", "40")]).unwrap_err();
        assert!(err.to_string().contains("crochet"));
    }

    #[test]
    fn rejects_garbage_numbers_and_backends() {
        assert!(cfg_from(&[("PORT", "eighty")]).is_err());
        assert!(cfg_from(&[("PATTERN_BACKEND", "llama")]).is_err());
    }

    #[test]
    fn blank_gemini_key_stays_in_demo_mode() {
        for blank in ["", "   "] {
            let cfg = cfg_from(&[("GEMINI_API_KEY", blank)]).unwrap();
            assert_eq!(cfg.gemini_api_key, DEMO_KEY);
            assert!(!cfg.has_gemini_key());
        }
        let cfg = cfg_from(&[("GEMINI_API_KEY", " abc ")]).unwrap();
        assert_eq!(cfg.gemini_api_key, "abc");
    }

    #[test]
    fn gemini_timeout_is_read_in_milliseconds() {
        assert_eq!(cfg_from(&[]).unwrap().gemini_timeout, Duration::from_secs(20));
        let cfg = cfg_from(&[("GEMINI_TIMEOUT_MS", "1500")]).unwrap();
        assert_eq!(cfg.gemini_timeout, Duration::from_millis(1500));
        assert!(cfg_from(&[("GEMINI_TIMEOUT_MS", "0")]).is_err());
    }

    #[test]
    fn latency_serializes_as_milliseconds() {
        let latency = Latency { base: Duration::from_millis(800), jitter: Duration::from_millis(200) };
        let json = serde_json::to_value(latency).unwrap();
        assert_eq!(json, serde_json::json!({ "base": 800, "jitter": 200 }));
    }

    #[test]
    fn beginner_bucket_is_smaller() {
        let counts = StitchCounts::default();
        for craft in Craft::ALL {
            let beginner = counts.for_request(craft, Difficulty::Beginner);
            assert!(beginner < counts.for_request(craft, Difficulty::Intermediate));
            assert_eq!(
                counts.for_request(craft, Difficulty::Intermediate),
                counts.for_request(craft, Difficulty::Advanced)
            );
        }
    }
}
