//! Disease guideline lookup.
//!
//! The knowledge base answers two read-only questions for the rest of the core: which known
//! disease a free-text goal refers to, and which profile fields a given disease and stage require
//! beyond the always-required ones.
//!
//! Guidelines are built in, and can be replaced by a YAML document of the form:
//!
//! ```yaml
//! diseases:
//!   - name: Breast Cancer
//!     aliases: [breast carcinoma]
//!     required_fields: []
//!     stages:
//!       - stage: II
//!         required_fields: [prior_treatment]
//! ```

use crate::profile::ProfileField;
use crate::{CarePlanError, CarePlanResult};
use serde::Deserialize;
use std::path::Path;

/// Read-only disease/stage requirement lookup.
pub trait KnowledgeBase: Send + Sync {
    /// Canonical disease name mentioned in `goal`, if any.
    fn match_disease(&self, goal: &str) -> Option<String>;

    /// Ordered fields required for `disease` at `stage`, in addition to the always-required ones.
    fn required_fields(&self, disease: &str, stage: &str) -> Vec<ProfileField>;
}

#[derive(Debug, Clone, Deserialize)]
struct StageGuideline {
    stage: String,
    #[serde(default)]
    required_fields: Vec<ProfileField>,
}

#[derive(Debug, Clone, Deserialize)]
struct DiseaseGuideline {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    required_fields: Vec<ProfileField>,
    #[serde(default)]
    stages: Vec<StageGuideline>,
}

impl DiseaseGuideline {
    fn new(name: &str, aliases: &[&str], required_fields: &[ProfileField]) -> Self {
        Self {
            name: name.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            required_fields: required_fields.to_vec(),
            stages: Vec::new(),
        }
    }

    fn stage(mut self, stage: &str, required_fields: &[ProfileField]) -> Self {
        self.stages.push(StageGuideline {
            stage: stage.to_string(),
            required_fields: required_fields.to_vec(),
        });
        self
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Deserialize)]
struct GuidelineDocument {
    diseases: Vec<DiseaseGuideline>,
}

/// Guideline-backed [`KnowledgeBase`].
#[derive(Debug, Clone)]
pub struct GuidelineKnowledgeBase {
    diseases: Vec<DiseaseGuideline>,
}

impl GuidelineKnowledgeBase {
    /// The built-in guideline set.
    pub fn builtin() -> Self {
        use ProfileField::{MedicalHistory, PriorTreatment, Symptoms};

        let diseases = vec![
            DiseaseGuideline::new("Breast Cancer", &["breast carcinoma"], &[])
                .stage("I", &[])
                .stage("II", &[PriorTreatment])
                .stage("III", &[PriorTreatment])
                .stage("IV", &[PriorTreatment, MedicalHistory]),
            DiseaseGuideline::new("Lung Cancer", &["lung carcinoma"], &[])
                .stage("I", &[])
                .stage("II", &[PriorTreatment])
                .stage("III", &[PriorTreatment])
                .stage("IV", &[PriorTreatment, MedicalHistory, Symptoms]),
            DiseaseGuideline::new("Diabetes", &["diabetic"], &[ProfileField::Age]),
            DiseaseGuideline::new(
                "Heart Disease",
                &["cardiac", "angina"],
                &[ProfileField::Age, Symptoms],
            ),
        ];
        Self { diseases }
    }

    /// Parse guidelines from a YAML document.
    ///
    /// # Errors
    ///
    /// Returns `CarePlanError::KnowledgeParse` if the document is malformed or names an unknown
    /// field, and `CarePlanError::InvalidInput` if it declares no diseases.
    pub fn from_yaml_str(yaml: &str) -> CarePlanResult<Self> {
        let doc: GuidelineDocument =
            serde_yaml::from_str(yaml).map_err(CarePlanError::KnowledgeParse)?;
        if doc.diseases.is_empty() {
            return Err(CarePlanError::InvalidInput(
                "guideline document declares no diseases".into(),
            ));
        }
        Ok(Self {
            diseases: doc.diseases,
        })
    }

    /// Load guidelines from a YAML file.
    pub fn from_yaml_file(path: &Path) -> CarePlanResult<Self> {
        let yaml = std::fs::read_to_string(path).map_err(CarePlanError::KnowledgeRead)?;
        Self::from_yaml_str(&yaml)
    }

    fn find(&self, disease: &str) -> Option<&DiseaseGuideline> {
        let disease = disease.trim();
        self.diseases
            .iter()
            .find(|d| d.names().any(|n| n.eq_ignore_ascii_case(disease)))
    }
}

impl Default for GuidelineKnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

fn normalise_stage(stage: &str) -> String {
    let lower = stage.trim().to_lowercase();
    lower
        .strip_prefix("stage ")
        .map(str::trim)
        .unwrap_or(lower.as_str())
        .to_string()
}

impl KnowledgeBase for GuidelineKnowledgeBase {
    fn match_disease(&self, goal: &str) -> Option<String> {
        let goal = goal.to_lowercase();
        self.diseases
            .iter()
            .find(|d| d.names().any(|n| goal.contains(&n.to_lowercase())))
            .map(|d| d.name.clone())
    }

    fn required_fields(&self, disease: &str, stage: &str) -> Vec<ProfileField> {
        let Some(guideline) = self.find(disease) else {
            return Vec::new();
        };

        let stage = normalise_stage(stage);
        let staged = guideline
            .stages
            .iter()
            .filter(|s| normalise_stage(&s.stage) == stage)
            .flat_map(|s| s.required_fields.iter().copied());

        let mut fields: Vec<ProfileField> = Vec::new();
        for field in guideline.required_fields.iter().copied().chain(staged) {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        fields
    }
}
