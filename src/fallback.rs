use crate::schema::MAX_AD_SECONDS;
use crate::types::{
    AdContext, FadePlan, Instrumentation, MusicDescriptor, Pace, ProductionResponse, VolumePlan,
};

const MIN_FALLBACK_SECONDS: f32 = 8.0;
const STOCK_PROMPT: &str = "light contemporary bed with a steady pulse and soft textures";
const STOCK_GENRE: &str = "modern pop";
const STOCK_MOOD: &str = "warm";
const STOCK_DIRECTION: &str =
    "stay understated beneath the voice, lift slightly between sentences";

// Built purely from word-count arithmetic so a rejected model response never
// forces a second generative call.
pub fn plan_from_script(script: &str, category: &str, pace: Pace) -> ProductionResponse {
    let words = script.split_whitespace().count();
    let duration_seconds =
        (words as f32 / pace.words_per_second()).clamp(MIN_FALLBACK_SECONDS, MAX_AD_SECONDS);

    ProductionResponse {
        script: script.trim().to_string(),
        context: AdContext {
            ad_category: category.trim().to_string(),
            tone: "neutral".to_string(),
            emotion: "calm".to_string(),
            pace,
            duration_seconds,
        },
        music: MusicDescriptor {
            prompt: STOCK_PROMPT.to_string(),
            target_bpm: Some(pace.default_bpm()),
            genre: STOCK_GENRE.to_string(),
            mood: STOCK_MOOD.to_string(),
            composer_direction: STOCK_DIRECTION.to_string(),
            instrumentation: Instrumentation {
                drums: Some("soft brushed kit".to_string()),
                bass: Some("round electric bass".to_string()),
                mids: Some("warm keys".to_string()),
                effects: None,
            },
            arc: None,
            button_ending: Some(false),
            musical_structure: None,
        },
        fades: FadePlan::default(),
        volume: VolumePlan::default(),
        mix_preset: None,
        sentence_cues: None,
        ad_format: None,
    }
}
