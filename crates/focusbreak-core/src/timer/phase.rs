use serde::{Deserialize, Serialize};

/// One segment of the focus cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Working,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn display_name(self) -> &'static str {
        match self {
            Phase::Idle => "Ready",
            Phase::Working => "Focus",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        }
    }

    pub fn break_kind(self) -> Option<BreakKind> {
        match self {
            Phase::ShortBreak => Some(BreakKind::Short),
            Phase::LongBreak => Some(BreakKind::Long),
            _ => None,
        }
    }
}

/// Which break follows a work session. Decided when the break is armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakKind {
    Short,
    Long,
}

impl BreakKind {
    pub fn phase(self) -> Phase {
        match self {
            BreakKind::Short => Phase::ShortBreak,
            BreakKind::Long => Phase::LongBreak,
        }
    }
}

/// Format seconds as `MM:SS`. Minutes are not capped at 99.
pub fn format_mmss(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_pads_both_fields() {
        assert_eq!(format_mmss(0), "00:00");
        assert_eq!(format_mmss(65), "01:05");
        assert_eq!(format_mmss(25 * 60), "25:00");
        assert_eq!(format_mmss(120 * 60), "120:00");
    }

    #[test]
    fn break_kind_maps_to_phase() {
        assert_eq!(BreakKind::Short.phase(), Phase::ShortBreak);
        assert_eq!(BreakKind::Long.phase(), Phase::LongBreak);
        assert_eq!(Phase::LongBreak.break_kind(), Some(BreakKind::Long));
        assert_eq!(Phase::Working.break_kind(), None);
        assert_eq!(Phase::Idle.break_kind(), None);
    }

    #[test]
    fn phase_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&Phase::ShortBreak).unwrap(),
            "\"short_break\""
        );
    }
}
