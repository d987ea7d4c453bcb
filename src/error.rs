use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PlanError {
    #[error("no JSON object found in model output")]
    Parse,
    #[error("schema validation failed: {}", violations.join("; "))]
    Schema { violations: Vec<String> },
    #[error(
        "generation window of {max_generation_seconds}s holds fewer than {min_bars} bars at {tempo} BPM"
    )]
    LoopWindow { max_generation_seconds: f32, tempo: u16, min_bars: u32 },
}

impl PlanError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Parse | Self::Schema { .. })
    }
}
