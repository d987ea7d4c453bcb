use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Tolerances;
use crate::error::PlanError;

pub const MIN_BPM: u16 = 60;
pub const MAX_BPM: u16 = 180;
pub const MIN_SEED_BARS: u32 = 4;

const MAX_PRE_ROLL_BARS: u32 = 4;
const SHORT_AD_SECONDS: f32 = 15.0;
const MID_AD_SECONDS: f32 = 30.0;
const ROOMY_BAR_SECONDS: f32 = 2.0;
const BAR_EPSILON: f32 = 1e-3;

// Genres that breathe slowly enough to earn an extra establishing bar.
const ATMOSPHERIC_GENRES: &[&str] = &["cinematic", "ambient"];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeSignature {
    #[serde(rename = "4/4")]
    FourFour,
    #[serde(rename = "3/4")]
    ThreeFour,
    #[serde(rename = "6/8")]
    SixEight,
    #[serde(rename = "12/8")]
    TwelveEight,
    #[serde(rename = "7/8")]
    SevenEight,
}

impl TimeSignature {
    pub const ALL: [TimeSignature; 5] = [
        Self::FourFour,
        Self::ThreeFour,
        Self::SixEight,
        Self::TwelveEight,
        Self::SevenEight,
    ];

    pub fn beats_per_bar(self) -> u32 {
        match self {
            Self::FourFour => 4,
            Self::ThreeFour => 3,
            Self::SixEight => 6,
            Self::TwelveEight => 12,
            Self::SevenEight => 7,
        }
    }

    // Notated beat unit relative to a quarter note: x/8 signatures count
    // eighth notes, so each beat is half as long.
    pub fn beat_unit(self) -> f32 {
        match self {
            Self::FourFour | Self::ThreeFour => 1.0,
            Self::SixEight | Self::TwelveEight | Self::SevenEight => 0.5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::FourFour => "4/4",
            Self::ThreeFour => "3/4",
            Self::SixEight => "6/8",
            Self::TwelveEight => "12/8",
            Self::SevenEight => "7/8",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "4/4" => Some(Self::FourFour),
            "3/4" => Some(Self::ThreeFour),
            "6/8" => Some(Self::SixEight),
            "12/8" => Some(Self::TwelveEight),
            "7/8" => Some(Self::SevenEight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BarGrid {
    pub tempo: u16,
    pub beats_per_bar: u32,
    pub beat_seconds: f32,
    pub bar_seconds: f32,
    pub total_bars: u32,
    pub total_seconds: f32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PrePostRoll {
    pub pre_roll_bars: u32,
    pub pre_roll_seconds: f32,
    pub post_roll_bars: u32,
    pub post_roll_seconds: f32,
    pub total_music_seconds: f32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct LoopPlan {
    pub seed_seconds: f32,
    pub seed_bars: u32,
    pub full_loops: u32,
    pub trim_seconds: f32,
    pub total_bars: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TempoFit {
    pub tempo: u16,
    pub bars: u32,
    pub seconds: f32,
    pub error_seconds: f32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AlignmentAction {
    UseAsIs,
    Trim { at_seconds: f32 },
    Loop { count: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Alignment {
    #[serde(flatten)]
    pub action: AlignmentAction,
    pub pre_roll_seconds: f32,
    pub target_seconds: f32,
}

pub fn beat_duration(tempo: u16, signature: TimeSignature) -> f32 {
    60.0 / tempo as f32 * signature.beat_unit()
}

pub fn bar_duration(tempo: u16, signature: TimeSignature) -> f32 {
    beat_duration(tempo, signature) * signature.beats_per_bar() as f32
}

pub fn ceil_to_bar(seconds: f32, tempo: u16, signature: TimeSignature) -> f32 {
    let bar = bar_duration(tempo, signature);
    bars_ceil(seconds, bar) as f32 * bar
}

pub fn floor_to_bar(seconds: f32, tempo: u16, signature: TimeSignature) -> f32 {
    let bar = bar_duration(tempo, signature);
    bars_floor(seconds, bar) as f32 * bar
}

pub fn round_to_bar(seconds: f32, tempo: u16, signature: TimeSignature) -> f32 {
    let bar = bar_duration(tempo, signature);
    (seconds / bar).round().max(0.0) * bar
}

pub fn nearest_downbeat(timestamp: f32, tempo: u16, signature: TimeSignature) -> f32 {
    round_to_bar(timestamp, tempo, signature)
}

pub fn nearest_beat(timestamp: f32, tempo: u16, signature: TimeSignature) -> f32 {
    let beat = beat_duration(tempo, signature);
    (timestamp / beat).round().max(0.0) * beat
}

pub fn grid(tempo: u16, signature: TimeSignature, seconds: f32) -> BarGrid {
    let beat_seconds = beat_duration(tempo, signature);
    let bar_seconds = bar_duration(tempo, signature);
    let total_bars = bars_ceil(seconds, bar_seconds);
    BarGrid {
        tempo,
        beats_per_bar: signature.beats_per_bar(),
        beat_seconds,
        bar_seconds,
        total_bars,
        total_seconds: total_bars as f32 * bar_seconds,
    }
}

pub fn pre_post_roll(
    voice_seconds: f32,
    tempo: u16,
    genre: &str,
    ad_seconds: f32,
    signature: TimeSignature,
) -> PrePostRoll {
    let bar = bar_duration(tempo, signature);
    let (pre, post) = if ad_seconds <= SHORT_AD_SECONDS {
        (1, 1)
    } else if ad_seconds <= MID_AD_SECONDS {
        // Mid-length spots only get the second establishing bar when bars
        // are short enough to spare the time.
        if bar <= ROOMY_BAR_SECONDS {
            (2, 2)
        } else {
            (1, 1)
        }
    } else {
        (2, 2)
    };
    let pre = if is_atmospheric(genre) { (pre + 1).min(MAX_PRE_ROLL_BARS) } else { pre };

    let pre_roll_seconds = pre as f32 * bar;
    let post_roll_seconds = post as f32 * bar;
    PrePostRoll {
        pre_roll_bars: pre,
        pre_roll_seconds,
        post_roll_bars: post,
        post_roll_seconds,
        total_music_seconds: pre_roll_seconds + voice_seconds + post_roll_seconds,
    }
}

pub fn loop_plan(
    total_needed: f32,
    tempo: u16,
    max_generation_seconds: f32,
    signature: TimeSignature,
) -> Result<LoopPlan, PlanError> {
    let bar = bar_duration(tempo, signature);
    let cap_bars = bars_floor(max_generation_seconds, bar);
    if cap_bars < MIN_SEED_BARS {
        return Err(PlanError::LoopWindow {
            max_generation_seconds,
            tempo,
            min_bars: MIN_SEED_BARS,
        });
    }

    let total_bars = bars_ceil(total_needed, bar).max(1);
    let seed_bars = cap_bars.min(total_bars).max(MIN_SEED_BARS);
    let full_loops = total_bars.div_ceil(seed_bars);
    debug!(
        "loop plan: {total_bars} bars from a {seed_bars}-bar seed repeated {full_loops} times"
    );
    Ok(LoopPlan {
        seed_seconds: seed_bars as f32 * bar,
        seed_bars,
        full_loops,
        trim_seconds: total_bars as f32 * bar,
        total_bars,
    })
}

pub fn optimize_bpm(
    target_tempo: u16,
    target_seconds: f32,
    radius: u16,
    signature: TimeSignature,
) -> TempoFit {
    let target_tempo = target_tempo.clamp(MIN_BPM, MAX_BPM);
    let lo = target_tempo.saturating_sub(radius).max(MIN_BPM);
    let hi = target_tempo.saturating_add(radius).min(MAX_BPM);

    let mut best = fit_for(target_tempo, target_seconds, signature);
    for tempo in lo..=hi {
        if tempo == target_tempo {
            continue;
        }
        let candidate = fit_for(tempo, target_seconds, signature);
        let tied = (candidate.error_seconds - best.error_seconds).abs() <= 1e-4;
        let closer_tempo = tempo.abs_diff(target_tempo) < best.tempo.abs_diff(target_tempo);
        if (tied && closer_tempo) || (!tied && candidate.error_seconds < best.error_seconds) {
            best = candidate;
        }
    }
    best
}

pub fn align_music_to_voice(
    music_seconds: f32,
    voice_seconds: f32,
    tempo: u16,
    genre: &str,
    signature: TimeSignature,
    tolerances: &Tolerances,
) -> Alignment {
    let roll = pre_post_roll(voice_seconds, tempo, genre, voice_seconds, signature);
    let target_seconds = ceil_to_bar(roll.total_music_seconds, tempo, signature);
    let slack = bar_duration(tempo, signature) * tolerances.alignment_bars;

    let action = if (music_seconds - target_seconds).abs() <= slack {
        AlignmentAction::UseAsIs
    } else if music_seconds > target_seconds {
        AlignmentAction::Trim { at_seconds: target_seconds }
    } else {
        let count = (target_seconds / music_seconds.max(BAR_EPSILON)).ceil() as u32;
        AlignmentAction::Loop { count }
    };
    debug!("alignment for {music_seconds:.2}s track against {target_seconds:.2}s target: {action:?}");

    Alignment { action, pre_roll_seconds: roll.pre_roll_seconds, target_seconds }
}

fn fit_for(tempo: u16, target_seconds: f32, signature: TimeSignature) -> TempoFit {
    let bar = bar_duration(tempo, signature);
    let bars = (target_seconds / bar).round().max(1.0) as u32;
    let seconds = bars as f32 * bar;
    TempoFit { tempo, bars, seconds, error_seconds: (seconds - target_seconds).abs() }
}

fn bars_ceil(seconds: f32, bar_seconds: f32) -> u32 {
    ((seconds / bar_seconds) - BAR_EPSILON).ceil().max(0.0) as u32
}

fn bars_floor(seconds: f32, bar_seconds: f32) -> u32 {
    ((seconds / bar_seconds) + BAR_EPSILON).floor().max(0.0) as u32
}

fn is_atmospheric(genre: &str) -> bool {
    let lowered = genre.to_lowercase();
    ATMOSPHERIC_GENRES.iter().any(|needle| lowered.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-3
    }

    #[test]
    fn bar_duration_follows_the_signature_table() {
        for signature in TimeSignature::ALL {
            for tempo in [40u16, 72, 100, 152, 200] {
                let expected = signature.beats_per_bar() as f32
                    * signature.beat_unit()
                    * 60.0
                    / tempo as f32;
                assert!(approx(bar_duration(tempo, signature), expected));
            }
        }
    }

    #[test]
    fn handles_the_twenty_seven_second_target() {
        let bar = bar_duration(100, TimeSignature::FourFour);
        assert!(approx(bar, 2.4));
        let snapped = ceil_to_bar(27.4, 100, TimeSignature::FourFour);
        assert!(approx(snapped, 28.8));
        let grid = grid(100, TimeSignature::FourFour, 27.4);
        assert_eq!(grid.total_bars, 12);
        assert!(approx(grid.total_seconds, 28.8));
    }

    #[test]
    fn snapping_is_idempotent_on_aligned_input() {
        for signature in TimeSignature::ALL {
            for tempo in [63u16, 100, 147] {
                let ceiled = ceil_to_bar(13.7, tempo, signature);
                assert!(approx(ceil_to_bar(ceiled, tempo, signature), ceiled));
                let floored = floor_to_bar(13.7, tempo, signature);
                assert!(approx(floor_to_bar(floored, tempo, signature), floored));
                let rounded = round_to_bar(13.7, tempo, signature);
                assert!(approx(round_to_bar(rounded, tempo, signature), rounded));
            }
        }
    }

    #[test]
    fn ceil_returns_smallest_bar_multiple_not_below_input() {
        let bar = bar_duration(120, TimeSignature::FourFour);
        let snapped = ceil_to_bar(7.3, 120, TimeSignature::FourFour);
        assert!(snapped + 1e-3 >= 7.3);
        assert!(snapped - bar < 7.3);
        assert!(approx(snapped % bar, 0.0) || approx(snapped % bar, bar));
    }

    #[test]
    fn short_ads_get_single_bar_rolls() {
        let roll = pre_post_roll(12.0, 100, "folk pop", 12.0, TimeSignature::FourFour);
        assert_eq!(roll.pre_roll_bars, 1);
        assert_eq!(roll.post_roll_bars, 1);
        assert!(approx(roll.total_music_seconds, 12.0 + 2.0 * 2.4));
    }

    #[test]
    fn mid_ads_get_second_bar_only_when_bars_are_short() {
        let roomy = pre_post_roll(26.0, 150, "folk pop", 27.0, TimeSignature::FourFour);
        assert_eq!(roomy.pre_roll_bars, 2);
        assert_eq!(roomy.post_roll_bars, 2);

        let tight = pre_post_roll(26.0, 90, "folk pop", 27.0, TimeSignature::FourFour);
        assert_eq!(tight.pre_roll_bars, 1);
        assert_eq!(tight.post_roll_bars, 1);
    }

    #[test]
    fn atmospheric_genres_earn_an_extra_pre_roll_bar() {
        let roll = pre_post_roll(40.0, 100, "Cinematic orchestral", 45.0, TimeSignature::FourFour);
        assert_eq!(roll.pre_roll_bars, 3);
        assert_eq!(roll.post_roll_bars, 2);
        assert!(roll.pre_roll_bars <= MAX_PRE_ROLL_BARS);
    }

    #[test]
    fn builds_loop_plan_within_provider_cap() {
        let plan = loop_plan(60.0, 120, 30.0, TimeSignature::FourFour)
            .expect("cap holds enough bars");
        let bar = bar_duration(120, TimeSignature::FourFour);
        assert!(plan.seed_seconds <= 30.0 + 1e-3);
        assert!(plan.seed_bars >= MIN_SEED_BARS);
        assert!(plan.full_loops * plan.seed_bars >= plan.total_bars);
        let bars = plan.trim_seconds / bar;
        assert!(approx(bars, bars.round()));
        assert_eq!(plan.total_bars, 30);
        assert_eq!(plan.full_loops, 2);
    }

    #[test]
    fn seed_never_shrinks_below_four_bars() {
        let plan = loop_plan(6.0, 120, 30.0, TimeSignature::FourFour)
            .expect("cap holds enough bars");
        assert_eq!(plan.seed_bars, MIN_SEED_BARS);
        assert_eq!(plan.full_loops, 1);
    }

    #[test]
    fn rejects_generation_window_below_four_bars() {
        let err = loop_plan(60.0, 60, 6.0, TimeSignature::FourFour)
            .expect_err("6s at 60 BPM is under four bars");
        assert!(matches!(err, PlanError::LoopWindow { .. }));
    }

    #[test]
    fn optimizer_finds_exact_divisor_tempo_in_radius() {
        let fit = optimize_bpm(97, 28.8, 5, TimeSignature::FourFour);
        assert_eq!(fit.tempo, 100);
        assert_eq!(fit.bars, 12);
        assert!(fit.error_seconds < 1e-2);
    }

    #[test]
    fn optimizer_breaks_ties_toward_the_requested_tempo() {
        // 24s divides exactly at 90, 100, 110 and 120 BPM in 4/4; from 105
        // the search must settle on one of the two nearest exact tempos.
        let fit = optimize_bpm(105, 24.0, 15, TimeSignature::FourFour);
        assert_eq!(fit.tempo, 100);
        assert!(fit.error_seconds < 1e-2);
        assert_eq!(fit.bars, 10);
    }

    #[test]
    fn aligns_close_track_as_is_with_voice_delay() {
        let tolerances = Tolerances::default();
        let alignment = align_music_to_voice(
            31.0,
            26.0,
            100,
            "folk pop",
            TimeSignature::FourFour,
            &tolerances,
        );
        assert_eq!(alignment.action, AlignmentAction::UseAsIs);
        assert!(approx(alignment.pre_roll_seconds, 2.4));
        assert!(approx(alignment.target_seconds, 31.2));
    }

    #[test]
    fn trims_long_track_at_bar_boundary() {
        let tolerances = Tolerances::default();
        let alignment = align_music_to_voice(
            40.0,
            26.0,
            100,
            "folk pop",
            TimeSignature::FourFour,
            &tolerances,
        );
        assert_eq!(alignment.action, AlignmentAction::Trim { at_seconds: alignment.target_seconds });
    }

    #[test]
    fn loops_short_track_enough_times_to_cover_target() {
        let tolerances = Tolerances::default();
        let alignment = align_music_to_voice(
            8.0,
            26.0,
            100,
            "folk pop",
            TimeSignature::FourFour,
            &tolerances,
        );
        let AlignmentAction::Loop { count } = alignment.action else {
            panic!("expected a loop decision");
        };
        assert!(count as f32 * 8.0 + 1e-3 >= alignment.target_seconds);
    }

    #[test]
    fn snaps_cue_timestamps_to_beat_and_downbeat() {
        assert!(approx(nearest_beat(3.8, 120, TimeSignature::FourFour), 4.0));
        assert!(approx(nearest_downbeat(3.8, 120, TimeSignature::FourFour), 4.0));
        assert!(approx(nearest_downbeat(2.9, 120, TimeSignature::FourFour), 2.0));
        assert!(approx(nearest_beat(2.9, 120, TimeSignature::FourFour), 3.0));
    }
}
