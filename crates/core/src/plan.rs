//! Final plan document and its assembly.

use crate::constants::{DISCLAIMER, MAX_RECOMMENDED_HOSPITALS};
use crate::profile::{Profile, ProfileField};
use crate::session::FailureCause;
use crate::upstream::{Decision, RankedFacility};
use serde::{Deserialize, Serialize};

/// The terminal artifact of a completed session.
///
/// Serialises to `{treatment_plan, recommended_hospitals, explanation, disclaimer}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    treatment_plan: Decision,
    recommended_hospitals: Vec<RankedFacility>,
    explanation: String,
    disclaimer: String,
}

impl Plan {
    pub fn treatment_plan(&self) -> &Decision {
        &self.treatment_plan
    }

    pub fn recommended_hospitals(&self) -> &[RankedFacility] {
        &self.recommended_hospitals
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    pub fn disclaimer(&self) -> &str {
        &self.disclaimer
    }
}

/// Well-formed response for a failed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub cause: FailureCause,
    pub disclaimer: String,
}

impl FailureReport {
    pub fn new(cause: FailureCause) -> Self {
        Self {
            cause,
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

/// Pure composition of decision, ranking and templated explanation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanAssembler;

impl PlanAssembler {
    /// Build the plan.
    ///
    /// Facilities are ordered by `priority_rank`, ties keeping their input order, and truncated
    /// to the top [`MAX_RECOMMENDED_HOSPITALS`].
    pub fn assemble(
        &self,
        profile: &Profile,
        decision: Decision,
        mut facilities: Vec<RankedFacility>,
    ) -> Plan {
        facilities.sort_by_key(|f| f.priority_rank);
        facilities.truncate(MAX_RECOMMENDED_HOSPITALS);

        let explanation = explain(profile, &decision, &facilities);
        Plan {
            treatment_plan: decision,
            recommended_hospitals: facilities,
            explanation,
            disclaimer: DISCLAIMER.to_string(),
        }
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let s = s.trim();
    (!s.is_empty()).then_some(s)
}

fn explain(profile: &Profile, decision: &Decision, facilities: &[RankedFacility]) -> String {
    let mut sentences: Vec<String> = Vec::new();

    let disease =
        non_empty(&decision.disease_type).or_else(|| profile.text(ProfileField::DiseaseType));
    let subject = match (profile.text(ProfileField::Stage), disease) {
        (Some(stage), Some(disease)) => format!("the reported stage {stage} {disease}"),
        (None, Some(disease)) => format!("the reported {disease}"),
        _ => "the information provided".to_string(),
    };
    match non_empty(&decision.treatment_type) {
        Some(treatment) => sentences.push(format!(
            "Based on {subject}, the recommended treatment approach is {treatment}."
        )),
        None => sentences.push(format!(
            "Based on {subject}, no specific treatment approach was recommended."
        )),
    }

    if let Some(timeline) = non_empty(&decision.timeline) {
        sentences.push(format!("The expected treatment timeline is {timeline}."));
    }

    match profile.flag(ProfileField::SurgeryAllowed) {
        Some(true) => sentences.push("You indicated that surgery is an acceptable option.".into()),
        Some(false) => sentences.push("You indicated that surgery is not an option.".into()),
        None => {}
    }

    if let Some(prior) = profile.text(ProfileField::PriorTreatment) {
        sentences.push(format!("Prior treatment reported: {prior}."));
    }

    if let Some(notes) = non_empty(&decision.notes) {
        sentences.push(format!("Clinical notes: {notes}."));
    }

    match facilities.first() {
        Some(top) => sentences.push(format!(
            "{} recommended facilities are listed; the highest ranked is {} in {}.",
            facilities.len(),
            top.name,
            top.location
        )),
        None => sentences.push("No matching facilities were found for this plan.".into()),
    }

    sentences.push(
        "Please consult a licensed medical professional for personalised guidance on these options."
            .into(),
    );
    sentences.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::Answer;

    fn facility(name: &str, rank: u32) -> RankedFacility {
        RankedFacility {
            name: name.into(),
            location: "Mumbai".into(),
            facility_type: "Oncology".into(),
            priority_rank: rank,
        }
    }

    fn breast_cancer_decision() -> Decision {
        Decision {
            disease_type: "Breast Cancer".into(),
            treatment_type: "Chemotherapy + Surgery".into(),
            timeline: "6 months".into(),
            notes: "Stage II, surgery allowed".into(),
        }
    }

    fn breast_cancer_profile() -> Profile {
        let mut profile = Profile::new();
        for (field, value) in [
            (ProfileField::DiseaseType, "Breast Cancer"),
            (ProfileField::Stage, "II"),
            (ProfileField::PriorTreatment, "none"),
            (ProfileField::SurgeryAllowed, "yes"),
        ] {
            profile.apply(&Answer::new(field, value));
        }
        profile
    }

    #[test]
    fn plan_matches_wire_shape() {
        let plan = PlanAssembler.assemble(
            &breast_cancer_profile(),
            breast_cancer_decision(),
            vec![facility("Apollo Cancer Centre", 1)],
        );

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(
            json["treatment_plan"],
            serde_json::json!({
                "disease_type": "Breast Cancer",
                "treatment_type": "Chemotherapy + Surgery",
                "timeline": "6 months",
                "notes": "Stage II, surgery allowed"
            })
        );
        assert_eq!(
            json["recommended_hospitals"],
            serde_json::json!([{
                "name": "Apollo Cancer Centre",
                "location": "Mumbai",
                "type": "Oncology",
                "priority_rank": 1
            }])
        );
        assert_eq!(json["disclaimer"], DISCLAIMER);
        let keys: Vec<&String> = json.as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn explanation_references_set_fields() {
        let plan = PlanAssembler.assemble(
            &breast_cancer_profile(),
            breast_cancer_decision(),
            Vec::new(),
        );

        let text = plan.explanation();
        assert!(text.starts_with(
            "Based on the reported stage II Breast Cancer, the recommended treatment approach is Chemotherapy + Surgery."
        ));
        assert!(text.contains("6 months"));
        assert!(text.contains("Prior treatment reported: none."));
        assert!(text.contains("No matching facilities"));
    }

    #[test]
    fn explanation_omits_unset_fields() {
        let decision = Decision {
            disease_type: "Diabetes".into(),
            treatment_type: "Lifestyle management".into(),
            timeline: String::new(),
            notes: String::new(),
        };
        let plan = PlanAssembler.assemble(&Profile::new(), decision, Vec::new());

        let text = plan.explanation();
        assert!(text.starts_with("Based on the reported Diabetes,"));
        assert!(!text.contains("timeline"));
        assert!(!text.contains("surgery"));
        assert!(!text.contains("Prior treatment"));
        assert!(!text.contains("Clinical notes"));
    }

    #[test]
    fn facilities_sorted_by_rank_with_stable_ties() {
        let plan = PlanAssembler.assemble(
            &Profile::new(),
            breast_cancer_decision(),
            vec![
                facility("C", 2),
                facility("A", 1),
                facility("B", 2),
                facility("D", 1),
            ],
        );

        let names: Vec<&str> = plan
            .recommended_hospitals()
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["A", "D", "C", "B"]);
    }

    #[test]
    fn at_most_five_facilities_are_recommended() {
        let facilities = (1..=8).map(|i| facility(&format!("F{i}"), i)).collect();
        let plan = PlanAssembler.assemble(&Profile::new(), breast_cancer_decision(), facilities);

        assert_eq!(plan.recommended_hospitals().len(), MAX_RECOMMENDED_HOSPITALS);
        assert_eq!(plan.recommended_hospitals()[0].name, "F1");
    }

    #[test]
    fn failure_report_carries_disclaimer() {
        let report = FailureReport::new(FailureCause::Aborted);
        assert_eq!(report.disclaimer, DISCLAIMER);
        assert_eq!(
            serde_json::to_value(&report).unwrap()["cause"],
            serde_json::json!({"kind": "aborted"})
        );
    }
}
