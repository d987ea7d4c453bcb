use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Pace {
    Slow,
    Medium,
    Fast,
}

impl Pace {
    pub fn default_bpm(self) -> u16 {
        match self {
            Self::Slow => 80,
            Self::Medium => 100,
            Self::Fast => 124,
        }
    }

    pub fn words_per_second(self) -> f32 {
        match self {
            Self::Slow => 2.1,
            Self::Medium => 2.6,
            Self::Fast => 3.1,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "slow" => Some(Self::Slow),
            "medium" | "moderate" => Some(Self::Medium),
            "fast" => Some(Self::Fast),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Medium => "medium",
            Self::Fast => "fast",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    Linear,
    Exponential,
    SCurve,
}

impl FadeCurve {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "linear" => Some(Self::Linear),
            "exponential" => Some(Self::Exponential),
            "s_curve" | "s-curve" => Some(Self::SCurve),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
            Self::SCurve => "s-curve",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdContext {
    pub ad_category: String,
    pub tone: String,
    pub emotion: String,
    pub pace: Pace,
    pub duration_seconds: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Instrumentation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drums: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bass: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mids: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effects: Option<String>,
}

impl Instrumentation {
    pub fn is_empty(&self) -> bool {
        self.drums.is_none() && self.bass.is_none() && self.mids.is_none() && self.effects.is_none()
    }

    pub fn bands(&self) -> Vec<(&'static str, &str)> {
        let mut bands = Vec::new();
        if let Some(drums) = self.drums.as_deref() {
            bands.push(("drums", drums));
        }
        if let Some(bass) = self.bass.as_deref() {
            bands.push(("bass", bass));
        }
        if let Some(mids) = self.mids.as_deref() {
            bands.push(("mids", mids));
        }
        if let Some(effects) = self.effects.as_deref() {
            bands.push(("effects", effects));
        }
        bands
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArcSegment {
    pub start_seconds: f32,
    pub end_seconds: f32,
    pub label: String,
    pub music_prompt: String,
    #[serde(rename = "targetBPM", default, skip_serializing_if = "Option::is_none")]
    pub target_bpm: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MusicDescriptor {
    pub prompt: String,
    #[serde(rename = "targetBPM", default, skip_serializing_if = "Option::is_none")]
    pub target_bpm: Option<u16>,
    pub genre: String,
    pub mood: String,
    #[serde(default)]
    pub composer_direction: String,
    #[serde(default)]
    pub instrumentation: Instrumentation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arc: Option<Vec<ArcSegment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_ending: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub musical_structure: Option<String>,
}

impl MusicDescriptor {
    pub fn has_structured_content(&self) -> bool {
        !self.instrumentation.is_empty()
            || self.arc.is_some()
            || !self.composer_direction.is_empty()
            || self.musical_structure.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FadePlan {
    pub fade_in_seconds: f32,
    pub fade_out_seconds: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<FadeCurve>,
}

impl Default for FadePlan {
    fn default() -> Self {
        Self { fade_in_seconds: 0.05, fade_out_seconds: 0.3, curve: Some(FadeCurve::Linear) }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumeSegment {
    pub start_seconds: f32,
    pub end_seconds: f32,
    pub music_volume: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VolumePlan {
    pub voice_volume: f32,
    pub music_volume: f32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<VolumeSegment>,
}

impl Default for VolumePlan {
    fn default() -> Self {
        Self { voice_volume: 1.0, music_volume: 0.3, segments: Vec::new() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SentenceCue {
    pub text: String,
    pub start_seconds: f32,
    pub end_seconds: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sfx: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    MusicSolo,
    VoiceoverWithMusic,
    VoiceoverSolo,
    Sfx,
    Silence,
}

impl SegmentKind {
    pub fn carries_voice(self) -> bool {
        matches!(self, Self::VoiceoverWithMusic | Self::VoiceoverSolo)
    }

    pub fn wants_music(self) -> bool {
        matches!(self, Self::MusicSolo | Self::VoiceoverWithMusic)
    }

    pub fn wants_sfx(self) -> bool {
        matches!(self, Self::Sfx)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MusicSolo => "music_solo",
            Self::VoiceoverWithMusic => "voiceover_with_music",
            Self::VoiceoverSolo => "voiceover_solo",
            Self::Sfx => "sfx",
            Self::Silence => "silence",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "music_solo" => Some(Self::MusicSolo),
            "voiceover_with_music" => Some(Self::VoiceoverWithMusic),
            "voiceover_solo" => Some(Self::VoiceoverSolo),
            "sfx" => Some(Self::Sfx),
            "silence" => Some(Self::Silence),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct VoiceLayer {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct MusicLayer {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SfxLayer {
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreativeSegment {
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: SegmentKind,
    pub duration_seconds: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music: Option<MusicLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sfx: Option<SfxLayer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreativePlan {
    pub template_id: String,
    pub total_duration_seconds: f32,
    #[serde(default)]
    pub music_direction: String,
    pub segments: Vec<CreativeSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProductionResponse {
    pub script: String,
    pub context: AdContext,
    pub music: MusicDescriptor,
    pub fades: FadePlan,
    pub volume: VolumePlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mix_preset: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence_cues: Option<Vec<SentenceCue>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ad_format: Option<CreativePlan>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomMusicRequest {
    pub custom_mode: bool,
    pub title: String,
    pub composition_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimpleMusicRequest {
    pub custom_mode: bool,
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MusicRequest {
    Custom(CustomMusicRequest),
    Simple(SimpleMusicRequest),
}

impl MusicRequest {
    pub fn custom(title: String, composition_text: String) -> Self {
        Self::Custom(CustomMusicRequest { custom_mode: true, title, composition_text })
    }

    pub fn simple(prompt: String) -> Self {
        Self::Simple(SimpleMusicRequest { custom_mode: false, prompt })
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }

    pub fn body_len(&self) -> usize {
        match self {
            Self::Custom(request) => request.composition_text.chars().count(),
            Self::Simple(request) => request.prompt.chars().count(),
        }
    }
}
