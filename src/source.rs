use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tracing::info;

use crate::{config::Latency, error::PatternError, models::{GenerationRequest, Pattern}, template::TemplateEngine};

/// Anything that can turn a form submission into a pattern.
#[async_trait]
pub trait PatternSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Pattern, PatternError>;
}

/// Waits `base + uniform(0..=jitter)`; a zero latency returns immediately.
pub async fn simulate_latency(latency: Latency) {
    if latency.is_zero() {
        return;
    }
    let jitter_ms = latency.jitter.as_millis() as u64;
    let extra = if jitter_ms == 0 { 0 } else { rand::thread_rng().gen_range(0..=jitter_ms) };
    tokio::time::sleep(latency.base + Duration::from_millis(extra)).await;
}

pub struct TemplateSource {
    engine: TemplateEngine,
    latency: Latency,
}

impl TemplateSource {
    pub fn new(engine: TemplateEngine, latency: Latency) -> Self {
        Self { engine, latency }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }
}

#[async_trait]
impl PatternSource for TemplateSource {
    fn name(&self) -> &'static str { "template" }

    async fn generate(&self, request: &GenerationRequest) -> Result<Pattern, PatternError> {
        info!("🧶 Template pattern for {} / {} / {}", request.item, request.craft, request.difficulty);
        simulate_latency(self.latency).await;
        Ok(self.engine.generate(request))
    }
}
