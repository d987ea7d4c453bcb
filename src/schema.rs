use serde_json::{Map, Value};
use tracing::warn;

use crate::error::PlanError;
use crate::extract;
use crate::timing::{MAX_BPM, MIN_BPM};
use crate::types::{
    AdContext, ArcSegment, CreativePlan, CreativeSegment, FadeCurve, FadePlan, Instrumentation,
    MusicDescriptor, MusicLayer, Pace, ProductionResponse, SegmentKind, SentenceCue, SfxLayer,
    VoiceLayer, VolumePlan, VolumeSegment,
};

pub const MAX_AD_SECONDS: f32 = 180.0;
pub const MIN_FADE_IN_SECONDS: f32 = 0.02;
pub const MAX_FADE_IN_SECONDS: f32 = 0.12;
pub const MIN_FADE_OUT_SECONDS: f32 = 0.1;
pub const MAX_FADE_OUT_SECONDS: f32 = 0.6;
pub const MAX_VOLUME: f32 = 2.0;

const MAX_SCRIPT_CHARS: usize = 2000;
const MAX_PROMPT_CHARS: usize = 500;
const MAX_DIRECTION_CHARS: usize = 300;
const MAX_LABEL_CHARS: usize = 120;
const MIN_ARC_SEGMENTS: usize = 2;
const MAX_ARC_SEGMENTS: usize = 4;
const ARC_COVERAGE_SLACK_SECONDS: f32 = 0.5;

const DEFAULT_GENRE: &str = "modern pop";
const DEFAULT_MOOD: &str = "warm";

pub fn validate(raw: &str) -> Result<ProductionResponse, PlanError> {
    let object_text = extract::first_json_object(raw).ok_or(PlanError::Parse)?;
    let value: Value = serde_json::from_str(object_text).map_err(|_| PlanError::Parse)?;
    let Value::Object(root) = value else {
        return Err(PlanError::Parse);
    };

    let mut violations = Vec::new();

    let script = req_string(&root, "", "script", &mut violations);
    let context = build_context(&root, &mut violations);
    let duration = context.as_ref().map(|context| context.duration_seconds);
    let music = build_music(&root, duration, &mut violations);
    let fades = build_fades(&root, &mut violations);
    let volume = build_volume(&root, &mut violations);
    let mix_preset = opt_string(&root, "", "mixPreset", &mut violations);
    let sentence_cues = build_cues(&root, &mut violations);
    let ad_format = build_ad_format(&root, &mut violations);

    match (script, context, music) {
        (Some(script), Some(context), Some(music)) if violations.is_empty() => {
            Ok(sanitize(ProductionResponse {
                script,
                context,
                music,
                fades: fades.unwrap_or_default(),
                volume: volume.unwrap_or_default(),
                mix_preset,
                sentence_cues,
                ad_format,
            }))
        }
        _ => Err(PlanError::Schema { violations }),
    }
}

fn build_context(root: &Map<String, Value>, violations: &mut Vec<String>) -> Option<AdContext> {
    let map = req_object(root, "", "context", violations)?;
    let ad_category = req_string(map, "context", "adCategory", violations);
    let tone = req_string(map, "context", "tone", violations);
    let emotion = req_string(map, "context", "emotion", violations);
    let pace = match req_string(map, "context", "pace", violations) {
        Some(value) => match Pace::parse(&value) {
            Some(pace) => Some(pace),
            None => {
                violations
                    .push(format!("context.pace: unknown value \"{value}\" (expected slow|medium|fast)"));
                None
            }
        },
        None => None,
    };
    let duration_seconds = match req_f32(map, "context", "durationSeconds", violations) {
        Some(value) if value > 0.0 => Some(value),
        Some(_) => {
            violations.push("context.durationSeconds: must be greater than zero".to_string());
            None
        }
        None => None,
    };

    match (ad_category, tone, emotion, pace, duration_seconds) {
        (Some(ad_category), Some(tone), Some(emotion), Some(pace), Some(duration_seconds)) => {
            Some(AdContext { ad_category, tone, emotion, pace, duration_seconds })
        }
        _ => None,
    }
}

fn build_music(
    root: &Map<String, Value>,
    duration: Option<f32>,
    violations: &mut Vec<String>,
) -> Option<MusicDescriptor> {
    let map = req_object(root, "", "music", violations)?;
    let prompt = req_string(map, "music", "prompt", violations);
    let target_bpm = opt_bpm(map, "music", "targetBPM", violations);
    let genre =
        opt_string(map, "music", "genre", violations).unwrap_or_else(|| DEFAULT_GENRE.to_string());
    let mood =
        opt_string(map, "music", "mood", violations).unwrap_or_else(|| DEFAULT_MOOD.to_string());
    let composer_direction =
        opt_string(map, "music", "composerDirection", violations).unwrap_or_default();
    let instrumentation = build_instrumentation(map, violations);
    let arc = build_arc(map, duration, violations);
    let button_ending = opt_bool(map, "music", "buttonEnding", violations);
    let musical_structure = opt_string(map, "music", "musicalStructure", violations);

    prompt.map(|prompt| MusicDescriptor {
        prompt,
        target_bpm,
        genre,
        mood,
        composer_direction,
        instrumentation,
        arc,
        button_ending,
        musical_structure,
    })
}

fn build_instrumentation(map: &Map<String, Value>, violations: &mut Vec<String>) -> Instrumentation {
    let Some(inner) = opt_object(map, "music", "instrumentation", violations) else {
        return Instrumentation::default();
    };
    Instrumentation {
        drums: opt_string(inner, "music.instrumentation", "drums", violations),
        bass: opt_string(inner, "music.instrumentation", "bass", violations),
        mids: opt_string(inner, "music.instrumentation", "mids", violations),
        effects: opt_string(inner, "music.instrumentation", "effects", violations),
    }
}

fn build_arc(
    map: &Map<String, Value>,
    duration: Option<f32>,
    violations: &mut Vec<String>,
) -> Option<Vec<ArcSegment>> {
    let entries = match map.get("arc") {
        None | Some(Value::Null) => return None,
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            violations.push("music.arc: expected an array".to_string());
            return None;
        }
    };

    if entries.len() < MIN_ARC_SEGMENTS || entries.len() > MAX_ARC_SEGMENTS {
        violations.push(format!(
            "music.arc: expected {MIN_ARC_SEGMENTS}-{MAX_ARC_SEGMENTS} segments, found {}",
            entries.len()
        ));
        return None;
    }

    let mut segments = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let path = format!("music.arc[{index}]");
        let Some(entry) = entry.as_object() else {
            violations.push(format!("{path}: expected an object"));
            continue;
        };
        let start_seconds = req_f32(entry, &path, "startSeconds", violations);
        let end_seconds = req_f32(entry, &path, "endSeconds", violations);
        let label = req_string(entry, &path, "label", violations);
        let music_prompt = req_string(entry, &path, "musicPrompt", violations);
        let target_bpm = opt_bpm(entry, &path, "targetBPM", violations);
        let energy_level = opt_string(entry, &path, "energyLevel", violations);

        if let (Some(start), Some(end)) = (start_seconds, end_seconds) {
            if start < 0.0 {
                violations.push(format!("{path}.startSeconds: must not be negative"));
            }
            if end <= start {
                violations
                    .push(format!("{path}.endSeconds: must be greater than startSeconds"));
            }
        }

        if let (Some(start_seconds), Some(end_seconds), Some(label), Some(music_prompt)) =
            (start_seconds, end_seconds, label, music_prompt)
        {
            segments.push(ArcSegment {
                start_seconds,
                end_seconds,
                label,
                music_prompt,
                target_bpm,
                energy_level,
            });
        }
    }

    if segments.len() != entries.len() {
        return None;
    }

    if let Some(duration) = duration {
        let starts_at = segments.iter().map(|s| s.start_seconds).fold(f32::MAX, f32::min);
        let ends_at = segments.iter().map(|s| s.end_seconds).fold(0.0f32, f32::max);
        if starts_at > ARC_COVERAGE_SLACK_SECONDS || ends_at < duration - ARC_COVERAGE_SLACK_SECONDS
        {
            violations.push("music.arc: segments must span the full ad duration".to_string());
            return None;
        }
    }

    Some(segments)
}

fn build_fades(root: &Map<String, Value>, violations: &mut Vec<String>) -> Option<FadePlan> {
    let map = opt_object(root, "", "fades", violations)?;
    let defaults = FadePlan::default();
    let fade_in_seconds = opt_f32(map, "fades", "fadeInSeconds", violations)
        .unwrap_or(defaults.fade_in_seconds);
    let fade_out_seconds = opt_f32(map, "fades", "fadeOutSeconds", violations)
        .unwrap_or(defaults.fade_out_seconds);
    let curve = match opt_string(map, "fades", "curve", violations) {
        Some(value) => match FadeCurve::parse(&value) {
            Some(curve) => Some(curve),
            None => {
                violations.push(format!(
                    "fades.curve: unknown value \"{value}\" (expected linear|exponential|s_curve)"
                ));
                None
            }
        },
        None => defaults.curve,
    };
    Some(FadePlan { fade_in_seconds, fade_out_seconds, curve })
}

fn build_volume(root: &Map<String, Value>, violations: &mut Vec<String>) -> Option<VolumePlan> {
    let map = opt_object(root, "", "volume", violations)?;
    let defaults = VolumePlan::default();
    let voice_volume =
        opt_f32(map, "volume", "voiceVolume", violations).unwrap_or(defaults.voice_volume);
    let music_volume =
        opt_f32(map, "volume", "musicVolume", violations).unwrap_or(defaults.music_volume);

    let mut segments = Vec::new();
    match map.get("segments") {
        None | Some(Value::Null) => {}
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                let path = format!("volume.segments[{index}]");
                let Some(entry) = entry.as_object() else {
                    violations.push(format!("{path}: expected an object"));
                    continue;
                };
                let start_seconds = req_f32(entry, &path, "startSeconds", violations);
                let end_seconds = req_f32(entry, &path, "endSeconds", violations);
                let music_volume = req_f32(entry, &path, "musicVolume", violations);
                if let (Some(start), Some(end)) = (start_seconds, end_seconds) {
                    if end <= start {
                        violations
                            .push(format!("{path}.endSeconds: must be greater than startSeconds"));
                        continue;
                    }
                }
                if let (Some(start_seconds), Some(end_seconds), Some(music_volume)) =
                    (start_seconds, end_seconds, music_volume)
                {
                    segments.push(VolumeSegment { start_seconds, end_seconds, music_volume });
                }
            }
        }
        Some(_) => violations.push("volume.segments: expected an array".to_string()),
    }

    Some(VolumePlan { voice_volume, music_volume, segments })
}

fn build_cues(root: &Map<String, Value>, violations: &mut Vec<String>) -> Option<Vec<SentenceCue>> {
    let entries = match root.get("sentenceCues") {
        None | Some(Value::Null) => return None,
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            violations.push("sentenceCues: expected an array".to_string());
            return None;
        }
    };

    let mut cues = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let path = format!("sentenceCues[{index}]");
        let Some(entry) = entry.as_object() else {
            violations.push(format!("{path}: expected an object"));
            continue;
        };
        let text = req_string(entry, &path, "text", violations);
        let start_seconds = req_f32(entry, &path, "startSeconds", violations);
        let end_seconds = req_f32(entry, &path, "endSeconds", violations);
        let sfx = opt_string(entry, &path, "sfx", violations);
        if let (Some(start), Some(end)) = (start_seconds, end_seconds) {
            if end < start {
                violations.push(format!("{path}.endSeconds: must not precede startSeconds"));
                continue;
            }
        }
        if let (Some(text), Some(start_seconds), Some(end_seconds)) =
            (text, start_seconds, end_seconds)
        {
            cues.push(SentenceCue { text, start_seconds, end_seconds, sfx });
        }
    }
    Some(cues)
}

fn build_ad_format(root: &Map<String, Value>, violations: &mut Vec<String>) -> Option<CreativePlan> {
    let map = opt_object(root, "", "adFormat", violations)?;
    let template_id = req_string(map, "adFormat", "templateId", violations);
    let total_duration_seconds =
        match req_f32(map, "adFormat", "totalDurationSeconds", violations) {
            Some(value) if value > 0.0 => Some(value),
            Some(_) => {
                violations
                    .push("adFormat.totalDurationSeconds: must be greater than zero".to_string());
                None
            }
            None => None,
        };
    let music_direction =
        opt_string(map, "adFormat", "musicDirection", violations).unwrap_or_default();

    let entries = match map.get("segments") {
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        Some(Value::Array(_)) => {
            violations.push("adFormat.segments: must not be empty".to_string());
            return None;
        }
        Some(_) => {
            violations.push("adFormat.segments: expected an array".to_string());
            return None;
        }
        None => {
            violations.push("adFormat.segments: required field is missing".to_string());
            return None;
        }
    };

    let mut segments = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let path = format!("adFormat.segments[{index}]");
        let Some(entry) = entry.as_object() else {
            violations.push(format!("{path}: expected an object"));
            continue;
        };
        if let Some(segment) = build_creative_segment(entry, &path, violations) {
            segments.push(segment);
        }
    }

    if segments.len() != entries.len() {
        return None;
    }

    match (template_id, total_duration_seconds) {
        (Some(template_id), Some(total_duration_seconds)) => Some(CreativePlan {
            template_id,
            total_duration_seconds,
            music_direction,
            segments,
        }),
        _ => None,
    }
}

fn build_creative_segment(
    entry: &Map<String, Value>,
    path: &str,
    violations: &mut Vec<String>,
) -> Option<CreativeSegment> {
    let index = match entry.get("index") {
        Some(Value::Number(value)) if value.as_u64().is_some() => {
            value.as_u64().map(|value| value as usize)
        }
        Some(_) => {
            violations.push(format!("{path}.index: expected a non-negative integer"));
            None
        }
        None => {
            violations.push(format!("{path}.index: required field is missing"));
            None
        }
    };
    let kind = match req_string(entry, path, "type", violations) {
        Some(value) => match SegmentKind::parse(&value) {
            Some(kind) => Some(kind),
            None => {
                violations.push(format!("{path}.type: unknown value \"{value}\""));
                None
            }
        },
        None => None,
    };
    let duration_seconds = match req_f32(entry, path, "durationSeconds", violations) {
        Some(value) if value > 0.0 => Some(value),
        Some(_) => {
            violations.push(format!("{path}.durationSeconds: must be greater than zero"));
            None
        }
        None => None,
    };

    let voice_path = format!("{path}.voice");
    let voice = opt_object(entry, path, "voice", violations).map(|inner| VoiceLayer {
        text: opt_string(inner, &voice_path, "text", violations).unwrap_or_default(),
        style: opt_string(inner, &voice_path, "style", violations),
    });
    let music_path = format!("{path}.music");
    let music = opt_object(entry, path, "music", violations).map(|inner| MusicLayer {
        prompt: opt_string(inner, &music_path, "prompt", violations).unwrap_or_default(),
        volume: opt_f32(inner, &music_path, "volume", violations),
    });
    let sfx_path = format!("{path}.sfx");
    let sfx = opt_object(entry, path, "sfx", violations).map(|inner| SfxLayer {
        description: opt_string(inner, &sfx_path, "description", violations).unwrap_or_default(),
    });
    let transition = opt_string(entry, path, "transition", violations);

    match (index, kind, duration_seconds) {
        (Some(index), Some(kind), Some(duration_seconds)) => Some(CreativeSegment {
            index,
            kind,
            duration_seconds,
            voice,
            music,
            sfx,
            transition,
        }),
        _ => None,
    }
}

fn sanitize(mut response: ProductionResponse) -> ProductionResponse {
    response.script = truncate_chars(response.script, MAX_SCRIPT_CHARS);
    response.context.ad_category = truncate_chars(response.context.ad_category, MAX_LABEL_CHARS);
    response.context.tone = truncate_chars(response.context.tone, MAX_LABEL_CHARS);
    response.context.emotion = truncate_chars(response.context.emotion, MAX_LABEL_CHARS);
    response.context.duration_seconds = clamp_field(
        response.context.duration_seconds,
        0.0,
        MAX_AD_SECONDS,
        "context.durationSeconds",
    );

    let pace = response.context.pace;
    response.music.target_bpm = Some(match response.music.target_bpm {
        Some(bpm) => clamp_bpm(bpm, "music.targetBPM"),
        None => pace.default_bpm(),
    });
    response.music.prompt = truncate_chars(response.music.prompt, MAX_PROMPT_CHARS);
    response.music.genre = truncate_chars(response.music.genre, MAX_LABEL_CHARS);
    response.music.mood = truncate_chars(response.music.mood, MAX_LABEL_CHARS);
    response.music.composer_direction =
        truncate_chars(response.music.composer_direction, MAX_DIRECTION_CHARS);
    response.music.musical_structure = response
        .music
        .musical_structure
        .map(|value| truncate_chars(value, MAX_DIRECTION_CHARS));
    response.music.instrumentation = Instrumentation {
        drums: response.music.instrumentation.drums.map(|v| truncate_chars(v, MAX_LABEL_CHARS)),
        bass: response.music.instrumentation.bass.map(|v| truncate_chars(v, MAX_LABEL_CHARS)),
        mids: response.music.instrumentation.mids.map(|v| truncate_chars(v, MAX_LABEL_CHARS)),
        effects: response
            .music
            .instrumentation
            .effects
            .map(|v| truncate_chars(v, MAX_LABEL_CHARS)),
    };
    if let Some(arc) = response.music.arc.as_mut() {
        for segment in arc.iter_mut() {
            segment.label = truncate_chars(std::mem::take(&mut segment.label), MAX_LABEL_CHARS);
            segment.music_prompt =
                truncate_chars(std::mem::take(&mut segment.music_prompt), MAX_DIRECTION_CHARS);
            segment.target_bpm = segment.target_bpm.map(|bpm| clamp_bpm(bpm, "music.arc.targetBPM"));
        }
    }

    response.fades.fade_in_seconds = clamp_field(
        response.fades.fade_in_seconds,
        MIN_FADE_IN_SECONDS,
        MAX_FADE_IN_SECONDS,
        "fades.fadeInSeconds",
    );
    response.fades.fade_out_seconds = clamp_field(
        response.fades.fade_out_seconds,
        MIN_FADE_OUT_SECONDS,
        MAX_FADE_OUT_SECONDS,
        "fades.fadeOutSeconds",
    );
    if response.fades.curve.is_none() {
        response.fades.curve = Some(FadeCurve::Linear);
    }

    response.volume.voice_volume =
        clamp_field(response.volume.voice_volume, 0.0, MAX_VOLUME, "volume.voiceVolume");
    response.volume.music_volume =
        clamp_field(response.volume.music_volume, 0.0, MAX_VOLUME, "volume.musicVolume");
    for segment in response.volume.segments.iter_mut() {
        segment.music_volume =
            clamp_field(segment.music_volume, 0.0, MAX_VOLUME, "volume.segments.musicVolume");
    }

    response.mix_preset = response.mix_preset.map(|value| truncate_chars(value, MAX_LABEL_CHARS));

    response
}

fn clamp_field(value: f32, lo: f32, hi: f32, field: &str) -> f32 {
    if value < lo || value > hi {
        warn!("{field} value {value} outside [{lo}, {hi}], clamping");
        value.clamp(lo, hi)
    } else {
        value
    }
}

fn clamp_bpm(value: u16, field: &str) -> u16 {
    if value < MIN_BPM || value > MAX_BPM {
        warn!("{field} value {value} outside [{MIN_BPM}, {MAX_BPM}] BPM, clamping");
        value.clamp(MIN_BPM, MAX_BPM)
    } else {
        value
    }
}

fn truncate_chars(value: String, max: usize) -> String {
    if value.chars().count() <= max {
        return value;
    }
    value.chars().take(max).collect::<String>().trim_end().to_string()
}

fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

fn req_object<'a>(
    map: &'a Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match map.get(key) {
        Some(Value::Object(inner)) => Some(inner),
        Some(_) => {
            violations.push(format!("{}: expected an object", field_path(parent, key)));
            None
        }
        None => {
            violations.push(format!("{}: required field is missing", field_path(parent, key)));
            None
        }
    }
}

fn opt_object<'a>(
    map: &'a Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(inner)) => Some(inner),
        Some(_) => {
            violations.push(format!("{}: expected an object", field_path(parent, key)));
            None
        }
    }
}

fn req_string(
    map: &Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<String> {
    match map.get(key) {
        Some(Value::String(value)) if !value.trim().is_empty() => Some(value.trim().to_string()),
        Some(Value::String(_)) => {
            violations.push(format!("{}: must not be empty", field_path(parent, key)));
            None
        }
        Some(_) => {
            violations.push(format!("{}: expected a string", field_path(parent, key)));
            None
        }
        None => {
            violations.push(format!("{}: required field is missing", field_path(parent, key)));
            None
        }
    }
}

fn opt_string(
    map: &Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<String> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(value)) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(_) => {
            violations.push(format!("{}: expected a string", field_path(parent, key)));
            None
        }
    }
}

fn req_f32(
    map: &Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<f32> {
    match map.get(key) {
        Some(Value::Number(value)) => {
            let parsed = value.as_f64().map(|v| v as f32);
            if parsed.is_none() {
                violations.push(format!("{}: expected a finite number", field_path(parent, key)));
            }
            parsed
        }
        Some(_) => {
            violations.push(format!("{}: expected a number", field_path(parent, key)));
            None
        }
        None => {
            violations.push(format!("{}: required field is missing", field_path(parent, key)));
            None
        }
    }
}

fn opt_f32(
    map: &Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<f32> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Number(value)) => value.as_f64().map(|v| v as f32),
        Some(_) => {
            violations.push(format!("{}: expected a number", field_path(parent, key)));
            None
        }
    }
}

fn opt_bpm(
    map: &Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<u16> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Number(value)) => match value.as_f64() {
            Some(parsed) if parsed > 0.0 => Some(parsed.round() as u16),
            _ => {
                violations
                    .push(format!("{}: expected a positive number", field_path(parent, key)));
                None
            }
        },
        Some(_) => {
            violations.push(format!("{}: expected a number", field_path(parent, key)));
            None
        }
    }
}

fn opt_bool(
    map: &Map<String, Value>,
    parent: &str,
    key: &str,
    violations: &mut Vec<String>,
) -> Option<bool> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Bool(value)) => Some(*value),
        Some(_) => {
            violations.push(format!("{}: expected a boolean", field_path(parent, key)));
            None
        }
    }
}
