//! Follow-up reminders scheduled when a plan completes.

use crate::upstream::Decision;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FollowUpKind {
    InitialConsultation,
    DiagnosticReports,
    TreatmentFollowUp,
}

impl FollowUpKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FollowUpKind::InitialConsultation => "initial_consultation",
            FollowUpKind::DiagnosticReports => "diagnostic_reports",
            FollowUpKind::TreatmentFollowUp => "treatment_follow_up",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub kind: FollowUpKind,
    pub message: String,
    pub due: NaiveDate,
}

/// Reminders at +7, +14 and +30 days from `from`.
pub fn schedule(decision: &Decision, from: DateTime<Utc>) -> Vec<FollowUp> {
    let due = |days: i64| (from + Duration::days(days)).date_naive();
    let timeline = match decision.timeline.trim() {
        "" => "as prescribed",
        timeline => timeline,
    };

    vec![
        FollowUp {
            kind: FollowUpKind::InitialConsultation,
            message: format!(
                "Schedule your first specialist appointment for {}.",
                decision.disease_type.trim()
            ),
            due: due(7),
        },
        FollowUp {
            kind: FollowUpKind::DiagnosticReports,
            message: "Collect all required diagnostic reports before your appointment.".into(),
            due: due(14),
        },
        FollowUp {
            kind: FollowUpKind::TreatmentFollowUp,
            message: format!(
                "Follow up with your specialist regarding treatment progress. Expected timeline: {timeline}."
            ),
            due: due(30),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn decision(timeline: &str) -> Decision {
        Decision {
            disease_type: "Diabetes".into(),
            treatment_type: "Insulin".into(),
            timeline: timeline.into(),
            notes: String::new(),
        }
    }

    #[test]
    fn reminders_are_due_at_fixed_offsets() {
        let from = Utc.with_ymd_and_hms(2026, 1, 28, 9, 30, 0).unwrap();
        let reminders = schedule(&decision("ongoing"), from);

        let due: Vec<(FollowUpKind, NaiveDate)> =
            reminders.iter().map(|r| (r.kind, r.due)).collect();
        assert_eq!(
            due,
            vec![
                (
                    FollowUpKind::InitialConsultation,
                    NaiveDate::from_ymd_opt(2026, 2, 4).unwrap()
                ),
                (
                    FollowUpKind::DiagnosticReports,
                    NaiveDate::from_ymd_opt(2026, 2, 11).unwrap()
                ),
                (
                    FollowUpKind::TreatmentFollowUp,
                    NaiveDate::from_ymd_opt(2026, 2, 27).unwrap()
                ),
            ]
        );
        assert!(reminders[0].message.contains("Diabetes"));
        assert!(reminders[2].message.contains("ongoing"));
    }

    #[test]
    fn missing_timeline_reads_as_prescribed() {
        let reminders = schedule(&decision(" "), Utc::now());
        assert!(reminders[2].message.ends_with("Expected timeline: as prescribed."));
    }
}
