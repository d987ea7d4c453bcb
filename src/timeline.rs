use tracing::debug;

use crate::config::Tolerances;
use crate::types::{CreativePlan, CreativeSegment, SegmentKind};

pub fn validate(plan: &CreativePlan, tolerances: &Tolerances) -> Vec<String> {
    let mut violations = Vec::new();
    check_indices(plan, &mut violations);
    check_duration_sum(plan, tolerances, &mut violations);
    check_layer_presence(plan, &mut violations);
    check_voice_presence(plan, &mut violations);
    check_music_solo_placement(plan, tolerances, &mut violations);
    debug!(
        "timeline validation of template {} produced {} violation(s)",
        plan.template_id,
        violations.len()
    );
    violations
}

fn check_indices(plan: &CreativePlan, violations: &mut Vec<String>) {
    for (expected, segment) in plan.segments.iter().enumerate() {
        if segment.index != expected {
            violations.push(format!(
                "segment indices must be contiguous from 0 (position {expected} declares index {})",
                segment.index
            ));
        }
    }
}

fn check_duration_sum(plan: &CreativePlan, tolerances: &Tolerances, violations: &mut Vec<String>) {
    let sum: f32 = plan.segments.iter().map(|segment| segment.duration_seconds).sum();
    if (sum - plan.total_duration_seconds).abs() > tolerances.duration_sum_seconds {
        violations.push(format!(
            "segment durations sum to {sum:.1}s but the plan declares {:.1}s (tolerance \u{b1}{:.1}s)",
            plan.total_duration_seconds, tolerances.duration_sum_seconds
        ));
    }
}

fn check_layer_presence(plan: &CreativePlan, violations: &mut Vec<String>) {
    for (position, segment) in plan.segments.iter().enumerate() {
        let kind = segment.kind;
        check_layer(position, kind, "voice", segment.voice.is_some(), kind.carries_voice(), violations);
        check_layer(position, kind, "music", segment.music.is_some(), kind.wants_music(), violations);
        check_layer(position, kind, "sfx", segment.sfx.is_some(), kind.wants_sfx(), violations);
    }
}

fn check_layer(
    position: usize,
    kind: SegmentKind,
    layer: &str,
    present: bool,
    expected: bool,
    violations: &mut Vec<String>,
) {
    if expected && !present {
        violations.push(format!(
            "segment {position} ({}) is missing its {layer} layer",
            kind.label()
        ));
    }
    if present && !expected {
        violations.push(format!(
            "segment {position} ({}) must not carry a {layer} layer",
            kind.label()
        ));
    }
}

fn check_voice_presence(plan: &CreativePlan, violations: &mut Vec<String>) {
    if !plan.segments.iter().any(|segment| segment.kind.carries_voice()) {
        violations.push("plan has no voice-bearing segment".to_string());
    }
}

fn check_music_solo_placement(
    plan: &CreativePlan,
    tolerances: &Tolerances,
    violations: &mut Vec<String>,
) {
    let last = plan.segments.len().saturating_sub(1);
    for (position, segment) in plan.segments.iter().enumerate() {
        if segment.kind != SegmentKind::MusicSolo {
            continue;
        }
        let voice_before =
            plan.segments[..position].iter().any(|earlier| earlier.kind.carries_voice());
        let voice_after =
            plan.segments[position + 1..].iter().any(|later| later.kind.carries_voice());
        if voice_before && voice_after {
            violations.push(format!(
                "music-only gap between voiceover segments at position {position}"
            ));
        } else if position != 0 && position != last {
            violations.push(format!(
                "music-only segment at position {position} must be first or last"
            ));
        }
        if segment.duration_seconds > tolerances.music_solo_max_seconds {
            violations.push(format!(
                "music-only segment at position {position} runs {:.1}s, cap is {:.1}s",
                segment.duration_seconds, tolerances.music_solo_max_seconds
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MusicLayer, SfxLayer, VoiceLayer};

    fn segment(index: usize, kind: SegmentKind, duration_seconds: f32) -> CreativeSegment {
        CreativeSegment {
            index,
            kind,
            duration_seconds,
            voice: kind.carries_voice().then(VoiceLayer::default),
            music: kind.wants_music().then(MusicLayer::default),
            sfx: kind.wants_sfx().then(SfxLayer::default),
            transition: None,
        }
    }

    fn plan(segments: Vec<CreativeSegment>, total: f32) -> CreativePlan {
        CreativePlan {
            template_id: "bookend_v1".to_string(),
            total_duration_seconds: total,
            music_direction: "warm and steady".to_string(),
            segments,
        }
    }

    #[test]
    fn accepts_bookended_voiceover_plan() {
        let plan = plan(
            vec![
                segment(0, SegmentKind::MusicSolo, 2.0),
                segment(1, SegmentKind::VoiceoverWithMusic, 26.0),
                segment(2, SegmentKind::MusicSolo, 2.0),
            ],
            30.0,
        );
        assert!(validate(&plan, &Tolerances::default()).is_empty());
    }

    #[test]
    fn flags_music_only_gap_between_voiceover_segments() {
        let plan = plan(
            vec![
                segment(0, SegmentKind::VoiceoverWithMusic, 12.0),
                segment(1, SegmentKind::MusicSolo, 2.0),
                segment(2, SegmentKind::VoiceoverWithMusic, 14.0),
                segment(3, SegmentKind::MusicSolo, 2.0),
            ],
            30.0,
        );
        let violations = validate(&plan, &Tolerances::default());
        assert!(violations
            .iter()
            .any(|v| v.contains("music-only gap between voiceover segments")));
    }

    #[test]
    fn flags_non_contiguous_indices() {
        let plan = plan(
            vec![
                segment(0, SegmentKind::VoiceoverWithMusic, 15.0),
                segment(3, SegmentKind::MusicSolo, 2.0),
            ],
            17.0,
        );
        let violations = validate(&plan, &Tolerances::default());
        assert!(violations.iter().any(|v| v.contains("contiguous from 0")));
    }

    #[test]
    fn flags_duration_sum_outside_tolerance() {
        let plan = plan(
            vec![
                segment(0, SegmentKind::VoiceoverWithMusic, 12.0),
                segment(1, SegmentKind::VoiceoverSolo, 10.0),
            ],
            30.0,
        );
        let violations = validate(&plan, &Tolerances::default());
        assert!(violations.iter().any(|v| v.contains("durations sum to 22.0s")));
    }

    #[test]
    fn tolerates_duration_sum_within_one_second() {
        let plan = plan(
            vec![
                segment(0, SegmentKind::VoiceoverWithMusic, 14.6),
                segment(1, SegmentKind::VoiceoverSolo, 14.6),
            ],
            30.0,
        );
        assert!(validate(&plan, &Tolerances::default()).is_empty());
    }

    #[test]
    fn flags_layers_that_contradict_the_segment_kind() {
        let mut stray = segment(0, SegmentKind::MusicSolo, 2.0);
        stray.voice = Some(VoiceLayer::default());
        let mut bare = segment(1, SegmentKind::VoiceoverWithMusic, 26.0);
        bare.music = None;
        let plan = plan(vec![stray, bare], 28.0);
        let violations = validate(&plan, &Tolerances::default());
        assert!(violations
            .iter()
            .any(|v| v.contains("segment 0 (music_solo) must not carry a voice layer")));
        assert!(violations
            .iter()
            .any(|v| v.contains("segment 1 (voiceover_with_music) is missing its music layer")));
    }

    #[test]
    fn flags_plan_without_any_voice() {
        let plan = plan(
            vec![
                segment(0, SegmentKind::MusicSolo, 3.0),
                segment(1, SegmentKind::Sfx, 3.0),
            ],
            6.0,
        );
        let violations = validate(&plan, &Tolerances::default());
        assert!(violations.iter().any(|v| v.contains("no voice-bearing segment")));
    }

    #[test]
    fn flags_music_solo_over_duration_cap() {
        let plan = plan(
            vec![
                segment(0, SegmentKind::MusicSolo, 9.0),
                segment(1, SegmentKind::VoiceoverWithMusic, 21.0),
            ],
            30.0,
        );
        let violations = validate(&plan, &Tolerances::default());
        assert!(violations.iter().any(|v| v.contains("cap is 5.0s")));
    }
}
