//! Post-decision clinical compliance review.
//!
//! A decision that cannot be safely presented as-is is not rejected: the session is marked for
//! manual clinical review and the plan is still produced.

use crate::profile::{Profile, ProfileField};
use crate::upstream::Decision;
use crate::validation::SURGICAL_KEYWORDS;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Treatment types that do not name a treatment.
const UNDEFINED_TREATMENTS: [&str; 3] = ["", "unknown", "tbd"];

/// One reason a decision needs manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComplianceFlag {
    UndefinedTreatment,
    SurgeryDeclined { treatment: String },
}

impl fmt::Display for ComplianceFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplianceFlag::UndefinedTreatment => {
                f.write_str("treatment type is undefined, clinical review required")
            }
            ComplianceFlag::SurgeryDeclined { treatment } => write!(
                f,
                "recommended treatment '{treatment}' includes surgery but surgery was declined"
            ),
        }
    }
}

/// Outcome of reviewing one decision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReview {
    pub flags: Vec<ComplianceFlag>,
}

impl ComplianceReview {
    pub fn requires_manual_review(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Provider-facing notice, `None` when the decision is compliant.
    pub fn notice(&self) -> Option<String> {
        if !self.requires_manual_review() {
            return None;
        }
        let flags: Vec<String> = self.flags.iter().map(ToString::to_string).collect();
        Some(format!(
            "This recommendation has been flagged for manual clinical review. A healthcare \
             provider should verify this plan before it is acted upon. Flags: {}",
            flags.join("; ")
        ))
    }
}

/// Check a decision against the profile it was made for.
pub fn review(profile: &Profile, decision: &Decision) -> ComplianceReview {
    let mut flags = Vec::new();
    let treatment = decision.treatment_type.trim();

    if UNDEFINED_TREATMENTS
        .iter()
        .any(|u| treatment.eq_ignore_ascii_case(u))
    {
        flags.push(ComplianceFlag::UndefinedTreatment);
    }

    let lower = treatment.to_lowercase();
    if profile.flag(ProfileField::SurgeryAllowed) == Some(false)
        && SURGICAL_KEYWORDS.iter().any(|k| lower.contains(k))
    {
        flags.push(ComplianceFlag::SurgeryDeclined {
            treatment: treatment.to_string(),
        });
    }

    ComplianceReview { flags }
}
