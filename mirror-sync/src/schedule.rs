//! Schedule evaluation and the per-target interval gate.
//!
//! A target's own schedule, when non-empty, replaces the global schedule
//! entirely; otherwise the global schedule applies; with neither the target
//! is always eligible. Enablement is checked by the engine, not here.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use mirror_core::types::minutes_to_duration;
use mirror_core::{ScheduleWindow, TargetWorkspace, WorkspaceId};

/// Spacing applied when no window matched (no schedule anywhere).
pub const DEFAULT_INTERVAL_MINUTES: f64 = 10.0;

/// Which schedule set decided eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleSource {
    Target,
    Global,
    Unscheduled,
}

/// Notice that a target schedule shadows a non-empty global one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleOverride {
    pub target: WorkspaceId,
    pub label: Option<String>,
    pub target_schedule: Vec<ScheduleWindow>,
    pub global_schedule: Vec<ScheduleWindow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleDecision {
    pub eligible: bool,
    /// First window containing the hour, if any.
    pub window: Option<ScheduleWindow>,
    /// Set whenever both schedules are non-empty, whatever `eligible` is.
    pub schedule_override: Option<ScheduleOverride>,
    pub source: ScheduleSource,
}

impl ScheduleDecision {
    /// Minimum spacing between syncs under this decision.
    pub fn interval(&self) -> Duration {
        match &self.window {
            Some(window) => window.interval(),
            None => minutes_to_duration(DEFAULT_INTERVAL_MINUTES),
        }
    }
}

/// Evaluate `target` at local `hour` (0..24).
pub fn evaluate(
    target: &TargetWorkspace,
    global: &[ScheduleWindow],
    hour: u32,
) -> ScheduleDecision {
    let schedule_override = (!target.schedule.is_empty() && !global.is_empty()).then(|| {
        ScheduleOverride {
            target: target.id,
            label: target.label.clone(),
            target_schedule: target.schedule.clone(),
            global_schedule: global.to_vec(),
        }
    });

    let (windows, source) = if !target.schedule.is_empty() {
        (target.schedule.as_slice(), ScheduleSource::Target)
    } else if !global.is_empty() {
        (global, ScheduleSource::Global)
    } else {
        return ScheduleDecision {
            eligible: true,
            window: None,
            schedule_override,
            source: ScheduleSource::Unscheduled,
        };
    };

    let window = windows.iter().find(|w| w.contains(hour)).copied();
    ScheduleDecision {
        eligible: window.is_some(),
        window,
        schedule_override,
        source,
    }
}

pub fn is_within_schedule(target: &TargetWorkspace, global: &[ScheduleWindow], hour: u32) -> bool {
    evaluate(target, global, hour).eligible
}

/// True when no sync has been recorded yet or `interval` has passed since.
pub fn interval_elapsed(
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: Duration,
) -> bool {
    match last {
        None => true,
        Some(last) => now - last >= interval,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: u8, end: u8, minutes: f64) -> ScheduleWindow {
        ScheduleWindow::new(start, end, minutes).unwrap()
    }

    fn target(schedule: Vec<ScheduleWindow>) -> TargetWorkspace {
        TargetWorkspace {
            id: WorkspaceId::parse("5c1b7e38-32d4-4ac5-b5c7-2d1f1d0e9a11").unwrap(),
            api_keys: vec![],
            destination: None,
            schedule,
            enabled: true,
            label: Some("staging".into()),
            disallow_create: false,
        }
    }

    #[test]
    fn target_schedule_overrides_global_inside_window() {
        let global = vec![window(9, 18, 10.0)];
        let t = target(vec![window(10, 17, 15.0)]);

        let decision = evaluate(&t, &global, 11);
        assert!(decision.eligible);
        assert_eq!(decision.source, ScheduleSource::Target);
        assert_eq!(decision.interval(), Duration::minutes(15));
        let notice = decision.schedule_override.expect("override");
        assert_eq!(notice.label.as_deref(), Some("staging"));
        assert_eq!(notice.global_schedule, global);
    }

    #[test]
    fn override_is_reported_even_when_out_of_schedule() {
        let global = vec![window(9, 18, 10.0)];
        let t = target(vec![window(10, 17, 15.0)]);

        let decision = evaluate(&t, &global, 22);
        assert!(!decision.eligible);
        assert!(decision.schedule_override.is_some());
    }

    #[test]
    fn target_only_schedule_has_no_override() {
        let t = target(vec![window(8, 12, 10.0)]);
        let decision = evaluate(&t, &[], 11);
        assert!(decision.eligible);
        assert!(decision.schedule_override.is_none());
    }

    #[test]
    fn global_only_schedule_applies_without_override() {
        let t = target(vec![]);
        let global = vec![window(22, 6, 5.0)];
        let decision = evaluate(&t, &global, 3);
        assert!(decision.eligible);
        assert_eq!(decision.source, ScheduleSource::Global);
        assert!(decision.schedule_override.is_none());
        assert!(!is_within_schedule(&t, &global, 12));
    }

    #[test]
    fn no_schedule_is_always_eligible() {
        let t = target(vec![]);
        let decision = evaluate(&t, &[], 3);
        assert!(decision.eligible);
        assert!(decision.schedule_override.is_none());
        assert_eq!(decision.interval(), Duration::minutes(10));
    }

    #[test]
    fn disabled_target_evaluates_like_enabled() {
        let mut t = target(vec![]);
        t.enabled = false;
        assert!(is_within_schedule(&t, &[], 3));
    }

    #[test]
    fn first_matching_window_wins() {
        let t = target(vec![window(8, 12, 5.0), window(10, 14, 30.0)]);
        let decision = evaluate(&t, &[], 11);
        assert_eq!(decision.window, Some(window(8, 12, 5.0)));
    }

    #[test]
    fn interval_gate() {
        let now = Utc::now();
        let ten = Duration::minutes(10);
        assert!(interval_elapsed(None, now, ten));
        assert!(!interval_elapsed(Some(now - Duration::minutes(9)), now, ten));
        assert!(interval_elapsed(Some(now - ten), now, ten));
    }
}
