use tracing::warn;

use crate::config::EngineConfig;
use crate::timing::{TempoFit, TimeSignature};
use crate::types::{MusicRequest, ProductionResponse};

const SECTION_SEPARATOR: &str = "\n";
const FALLBACK_INSTRUMENTATION: &str = "balanced full-band arrangement";

// Loudness presets by delivery platform: (name, voice level, music level).
const MIX_PRESETS: &[(&str, f32, f32)] = &[
    ("radio", 1.0, 0.4),
    ("podcast", 1.0, 0.3),
    ("streaming", 1.0, 0.35),
    ("social", 1.1, 0.5),
];

#[derive(Debug, Clone, Copy)]
pub struct TimingHint {
    pub fit: TempoFit,
    pub signature: TimeSignature,
}

#[derive(Debug, Default)]
pub struct PromptComposer;

impl PromptComposer {
    pub fn new() -> Self {
        Self
    }

    pub fn compose(
        &self,
        response: &ProductionResponse,
        enrichment: Option<&str>,
        hint: Option<&TimingHint>,
        cfg: &EngineConfig,
    ) -> MusicRequest {
        self.compose_for(response, enrichment, hint, cfg, cfg.limits.composition_max_chars)
    }

    // Re-rendering against a second provider only changes the budget, so the
    // same response can be composed once per provider.
    pub fn compose_for(
        &self,
        response: &ProductionResponse,
        enrichment: Option<&str>,
        hint: Option<&TimingHint>,
        cfg: &EngineConfig,
        budget: usize,
    ) -> MusicRequest {
        if !response.music.has_structured_content() {
            return MusicRequest::simple(simple_prompt(
                response,
                cfg.limits.simple_prompt_max_chars,
            ));
        }

        let head = head_sections(response, hint);
        let closing = closing_section(response);
        let optional = optional_sections(response, enrichment);

        let separator_len = SECTION_SEPARATOR.chars().count();
        let mut used = head.iter().map(|section| section.chars().count()).sum::<usize>()
            + separator_len * head.len()
            + closing.chars().count();

        let mut kept: Vec<String> = Vec::with_capacity(optional.len());
        for section in optional {
            let extra = separator_len + section.chars().count();
            if used + extra > budget {
                break;
            }
            used += extra;
            kept.push(section);
        }

        let mut sections = head;
        sections.extend(kept);
        sections.push(closing);
        let mut text = sections.join(SECTION_SEPARATOR);

        if text.chars().count() > budget {
            warn!(
                "composed prompt still exceeds the {budget}-char budget after dropping every optional section, hard truncating"
            );
            text = truncate_chars(text, budget);
        }

        let title = truncate_chars(
            format!("{} spot: {}", response.context.ad_category, response.music.genre),
            cfg.limits.title_max_chars,
        );
        MusicRequest::custom(title, text)
    }
}

fn head_sections(response: &ProductionResponse, hint: Option<&TimingHint>) -> Vec<String> {
    let music = &response.music;
    let bpm = music.target_bpm.unwrap_or_else(|| response.context.pace.default_bpm());

    let tempo = match hint {
        Some(hint) => format!(
            "Tempo {} BPM, {}, exactly {} bars ({:.1}s).",
            hint.fit.tempo,
            hint.signature.label(),
            hint.fit.bars,
            hint.fit.seconds
        ),
        None => format!(
            "Tempo {} BPM, target length {:.1}s.",
            bpm, response.context.duration_seconds
        ),
    };

    let mut style = format!("Style: {}, {} mood.", music.genre, music.mood);
    if let Some(structure) = music.musical_structure.as_deref() {
        style.push_str(&format!(" Structure: {structure}."));
    }

    let bands = music.instrumentation.bands();
    let mut arrangement = if bands.is_empty() {
        format!("Instrumentation: {FALLBACK_INSTRUMENTATION}.")
    } else {
        let described = bands
            .iter()
            .map(|(band, value)| format!("{band}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        format!("Instrumentation: {described}.")
    };
    if !music.composer_direction.is_empty() {
        arrangement.push_str(&format!(" Direction: {}.", music.composer_direction));
    }

    vec![tempo, style, arrangement]
}

fn closing_section(response: &ProductionResponse) -> String {
    let ending = if response.music.button_ending.unwrap_or(false) {
        "End with a clean button on the final downbeat, no fade.".to_string()
    } else {
        format!("End with a {:.1}s fade-out.", response.fades.fade_out_seconds)
    };
    format!("Maintain one continuous musical bed with no silent gaps. {ending}")
}

fn optional_sections(response: &ProductionResponse, enrichment: Option<&str>) -> Vec<String> {
    let mut sections = Vec::new();
    let context = &response.context;

    sections.push(format!(
        "Context: {:.0}s {} ad, {} tone, {} emotion, {} pace.",
        context.duration_seconds,
        context.ad_category,
        context.tone,
        context.emotion,
        context.pace.label()
    ));
    sections.push(format!("Scene: {}", response.music.prompt));

    if let Some(arc) = response.music.arc.as_deref() {
        let described = arc
            .iter()
            .map(|segment| {
                let mut text = format!(
                    "{:.0}-{:.0}s {}: {}",
                    segment.start_seconds, segment.end_seconds, segment.label, segment.music_prompt
                );
                if let Some(bpm) = segment.target_bpm {
                    text.push_str(&format!(" at {bpm} BPM"));
                }
                if let Some(energy) = segment.energy_level.as_deref() {
                    text.push_str(&format!(" ({energy} energy)"));
                }
                text
            })
            .collect::<Vec<_>>()
            .join("; ");
        sections.push(format!("Arc: {described}."));
    }

    let fades = &response.fades;
    let curve = fades.curve.map(|curve| curve.label()).unwrap_or("linear");
    sections.push(format!(
        "Fade in {:.2}s, fade out {:.2}s, {} curve.",
        fades.fade_in_seconds, fades.fade_out_seconds, curve
    ));

    let volume = &response.volume;
    let mut mix = format!(
        "Voice at {:.2}x over music at {:.2}x.",
        volume.voice_volume, volume.music_volume
    );
    for segment in &volume.segments {
        mix.push_str(&format!(
            " Music {:.2}x from {:.1}s to {:.1}s.",
            segment.music_volume, segment.start_seconds, segment.end_seconds
        ));
    }
    sections.push(mix);

    if let Some(preset) = response.mix_preset.as_deref() {
        sections.push(mix_preset_section(preset));
    }

    if let Some(cues) = response.sentence_cues.as_deref() {
        if !cues.is_empty() {
            let described = cues
                .iter()
                .map(|cue| format!("\"{}\" {:.1}-{:.1}s", cue.text, cue.start_seconds, cue.end_seconds))
                .collect::<Vec<_>>()
                .join("; ");
            sections.push(format!("Voice cues: {described}."));
        }
    }

    if let Some(enrichment) = enrichment {
        let trimmed = enrichment.trim();
        if !trimmed.is_empty() {
            sections.push(trimmed.to_string());
        }
    }

    sections
}

fn mix_preset_section(preset: &str) -> String {
    let lowered = preset.to_lowercase();
    match MIX_PRESETS.iter().find(|(name, _, _)| *name == lowered) {
        Some((name, voice, music)) => {
            format!("Mix preset '{name}': voice {voice:.1}x, music {music:.1}x.")
        }
        None => format!("Mix preset '{preset}'."),
    }
}

fn simple_prompt(response: &ProductionResponse, budget: usize) -> String {
    let music = &response.music;
    let bpm = music.target_bpm.unwrap_or_else(|| response.context.pace.default_bpm());
    let parts = vec![
        music.prompt.clone(),
        music.genre.clone(),
        format!("{} mood", music.mood),
        format!("{bpm} BPM"),
        format!("{} tone", response.context.tone),
    ];
    truncate_chars(parts.join(", "), budget)
}

fn truncate_chars(value: String, max: usize) -> String {
    if value.chars().count() <= max {
        return value;
    }
    value.chars().take(max).collect::<String>().trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        AdContext, ArcSegment, FadePlan, Instrumentation, MusicDescriptor, Pace,
        ProductionResponse, SentenceCue, VolumePlan, VolumeSegment,
    };

    fn sample_response() -> ProductionResponse {
        ProductionResponse {
            script: "Fresh bread, every morning.".to_string(),
            context: AdContext {
                ad_category: "retail".to_string(),
                tone: "friendly".to_string(),
                emotion: "delight".to_string(),
                pace: Pace::Medium,
                duration_seconds: 30.0,
            },
            music: MusicDescriptor {
                prompt: "warm acoustic morning feel with light percussion".to_string(),
                target_bpm: Some(104),
                genre: "folk pop".to_string(),
                mood: "inviting".to_string(),
                composer_direction: "keep the bed understated under the voice".to_string(),
                instrumentation: Instrumentation {
                    drums: Some("brushed kit".to_string()),
                    bass: Some("upright bass".to_string()),
                    mids: Some("acoustic guitar".to_string()),
                    effects: None,
                },
                arc: Some(vec![
                    ArcSegment {
                        start_seconds: 0.0,
                        end_seconds: 12.0,
                        label: "open".to_string(),
                        music_prompt: "gentle build".to_string(),
                        target_bpm: Some(104),
                        energy_level: Some("low".to_string()),
                    },
                    ArcSegment {
                        start_seconds: 12.0,
                        end_seconds: 30.0,
                        label: "lift".to_string(),
                        music_prompt: "full arrangement, brighter".to_string(),
                        target_bpm: None,
                        energy_level: Some("medium".to_string()),
                    },
                ]),
                button_ending: Some(true),
                musical_structure: None,
            },
            fades: FadePlan::default(),
            volume: VolumePlan {
                voice_volume: 1.0,
                music_volume: 0.35,
                segments: vec![VolumeSegment {
                    start_seconds: 0.0,
                    end_seconds: 3.0,
                    music_volume: 0.8,
                }],
            },
            mix_preset: Some("radio".to_string()),
            sentence_cues: Some(vec![SentenceCue {
                text: "Fresh bread, every morning.".to_string(),
                start_seconds: 3.0,
                end_seconds: 6.2,
                sfx: None,
            }]),
            ad_format: None,
        }
    }

    fn body_text(request: &MusicRequest) -> String {
        match request {
            MusicRequest::Custom(custom) => custom.composition_text.clone(),
            MusicRequest::Simple(simple) => simple.prompt.clone(),
        }
    }

    #[test]
    fn builds_custom_request_within_budget() {
        let cfg = EngineConfig::default();
        let composer = PromptComposer::new();
        let request = composer.compose(&sample_response(), None, None, &cfg);
        assert!(request.is_custom());
        assert!(request.body_len() <= cfg.limits.composition_max_chars);
        let MusicRequest::Custom(custom) = &request else {
            panic!("expected a custom request");
        };
        assert!(custom.custom_mode);
        assert!(custom.title.chars().count() <= cfg.limits.title_max_chars);
        let text = body_text(&request);
        assert!(text.contains("Tempo 104 BPM"));
        assert!(text.contains("Style: folk pop"));
        assert!(text.contains("Instrumentation: drums: brushed kit"));
        assert!(text.contains("clean button"));
        assert!(text.contains("Arc: 0-12s open"));
        assert!(text.contains("Mix preset 'radio'"));
    }

    #[test]
    fn mandatory_sections_survive_a_tight_budget() {
        let cfg = EngineConfig::default();
        let composer = PromptComposer::new();
        let full = body_text(&composer.compose(&sample_response(), None, None, &cfg));
        let tight = composer.compose_for(&sample_response(), None, None, &cfg, 360);
        let text = body_text(&tight);

        assert!(text.chars().count() <= 360);
        assert!(text.chars().count() < full.chars().count());
        assert!(text.contains("Tempo 104 BPM"));
        assert!(text.contains("Style: folk pop"));
        assert!(text.contains("Instrumentation:"));
        assert!(text.contains("clean button"));
        assert!(!text.contains("Voice cues"));
    }

    #[test]
    fn drops_sections_whole_never_partially() {
        let cfg = EngineConfig::default();
        let composer = PromptComposer::new();
        let full = body_text(&composer.compose(&sample_response(), None, None, &cfg));
        let full_lines: Vec<&str> = full.lines().collect();
        for budget in [360usize, 450, 600, 900] {
            let request = composer.compose_for(&sample_response(), None, None, &cfg, budget);
            let text = body_text(&request);
            assert!(text.chars().count() <= budget, "budget {budget} overflowed");
            for line in text.lines() {
                assert!(full_lines.contains(&line), "line was cut mid-section: {line}");
            }
        }
    }

    #[test]
    fn tighter_provider_budget_drops_lower_priority_sections_first() {
        let cfg = EngineConfig::default();
        let composer = PromptComposer::new();
        let wide = body_text(&composer.compose_for(
            &sample_response(),
            None,
            None,
            &cfg,
            cfg.limits.composition_max_chars,
        ));
        let narrow = body_text(&composer.compose_for(&sample_response(), None, None, &cfg, 460));
        assert!(wide.contains("Voice cues"));
        assert!(narrow.chars().count() <= 460);
        assert!(narrow.contains("Context:"));
        assert!(!narrow.contains("Voice cues"));
    }

    #[test]
    fn hard_truncates_when_even_mandatory_sections_overflow() {
        let cfg = EngineConfig::default();
        let composer = PromptComposer::new();
        let request = composer.compose_for(&sample_response(), None, None, &cfg, 80);
        assert!(request.body_len() <= 80);
    }

    #[test]
    fn unstructured_descriptor_falls_back_to_simple_prompt() {
        let cfg = EngineConfig::default();
        let mut response = sample_response();
        response.music.instrumentation = Instrumentation::default();
        response.music.arc = None;
        response.music.composer_direction = String::new();
        response.music.musical_structure = None;

        let composer = PromptComposer::new();
        let request = composer.compose(&response, None, None, &cfg);
        assert!(!request.is_custom());
        assert!(request.body_len() <= cfg.limits.simple_prompt_max_chars);
        let text = body_text(&request);
        assert!(text.contains("folk pop"));
        assert!(text.contains("104 BPM"));
    }

    #[test]
    fn timing_hint_overrides_the_tempo_line() {
        let cfg = EngineConfig::default();
        let hint = TimingHint {
            fit: TempoFit { tempo: 100, bars: 12, seconds: 28.8, error_seconds: 0.0 },
            signature: TimeSignature::FourFour,
        };
        let composer = PromptComposer::new();
        let text = body_text(&composer.compose(&sample_response(), None, Some(&hint), &cfg));
        assert!(text.contains("Tempo 100 BPM, 4/4, exactly 12 bars (28.8s)."));
    }

    #[test]
    fn enrichment_text_rides_along_when_budget_allows() {
        let cfg = EngineConfig::default();
        let composer = PromptComposer::new();
        let text = body_text(&composer.compose(
            &sample_response(),
            Some("Lean on bossa nova phrasing common in Brazilian breakfast radio."),
            None,
            &cfg,
        ));
        assert!(text.contains("bossa nova phrasing"));
    }
}
