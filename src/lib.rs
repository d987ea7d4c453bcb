pub mod composer;
pub mod config;
pub mod error;
pub mod extract;
pub mod fallback;
pub mod schema;
pub mod timeline;
pub mod timing;
pub mod types;

pub use error::PlanError;

use serde::Serialize;

use composer::{PromptComposer, TimingHint};
use config::EngineConfig;
use timing::{PrePostRoll, TempoFit, TimeSignature};
use types::{MusicRequest, ProductionResponse};

pub const DEFAULT_TIME_SIGNATURE: TimeSignature = TimeSignature::FourFour;
const TEMPO_SEARCH_RADIUS: u16 = 8;

#[derive(Debug, Clone, Serialize)]
pub struct PreparedAd {
    pub response: ProductionResponse,
    pub timeline_violations: Vec<String>,
    pub fit: TempoFit,
    pub roll: PrePostRoll,
    pub request: MusicRequest,
}

pub fn prepare_request(raw: &str, cfg: &EngineConfig) -> Result<PreparedAd, PlanError> {
    let response = schema::validate(raw)?;

    let timeline_violations = response
        .ad_format
        .as_ref()
        .map(|plan| timeline::validate(plan, &cfg.tolerances))
        .unwrap_or_default();

    let tempo =
        response.music.target_bpm.unwrap_or_else(|| response.context.pace.default_bpm());
    let duration = response.context.duration_seconds;
    let fit = timing::optimize_bpm(tempo, duration, TEMPO_SEARCH_RADIUS, DEFAULT_TIME_SIGNATURE);
    let roll = timing::pre_post_roll(
        duration,
        fit.tempo,
        &response.music.genre,
        duration,
        DEFAULT_TIME_SIGNATURE,
    );

    let hint = TimingHint { fit, signature: DEFAULT_TIME_SIGNATURE };
    let request = PromptComposer::new().compose(&response, None, Some(&hint), cfg);

    Ok(PreparedAd { response, timeline_violations, fit, roll, request })
}
