//! Evaluation rubric: criteria loaded from `{"evaluation_criteria": [...]}`.
//!
//! The evaluation style of a criterion is encoded in its name prefix,
//! `"(Multiple Choice)"` or `"(Ranking)"`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const MULTIPLE_CHOICE_PREFIX: &str = "(Multiple Choice)";
pub const RANKING_PREFIX: &str = "(Ranking)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriterionKind {
    MultipleChoice,
    Ranking,
    Unknown,
}

impl CriterionKind {
    pub fn from_name(name: &str) -> Self {
        if name.starts_with(MULTIPLE_CHOICE_PREFIX) {
            Self::MultipleChoice
        } else if name.starts_with(RANKING_PREFIX) {
            Self::Ranking
        } else {
            Self::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationCriterion {
    pub id: u32,
    pub name: String,
    pub description: String,
}

impl EvaluationCriterion {
    pub fn kind(&self) -> CriterionKind {
        CriterionKind::from_name(&self.name)
    }
}

/// Requested ids that the rubric does not define.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingCriteria(pub Vec<u32>);

impl std::fmt::Display for MissingCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "criteria not found in rubric: {:?}", self.0)
    }
}

impl std::error::Error for MissingCriteria {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rubric {
    pub evaluation_criteria: Vec<EvaluationCriterion>,
}

impl Rubric {
    pub fn from_json(json: &str, path: &Path) -> ConfigResult<Self> {
        serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> ConfigResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json, path)
    }

    pub fn get(&self, id: u32) -> Option<&EvaluationCriterion> {
        self.evaluation_criteria.iter().find(|c| c.id == id)
    }

    /// Criteria whose id is in `ids`, in rubric order. Ignores unknown ids.
    pub fn matching(&self, ids: &[u32]) -> Vec<EvaluationCriterion> {
        self.evaluation_criteria
            .iter()
            .filter(|c| ids.contains(&c.id))
            .cloned()
            .collect()
    }

    /// Strict selection: every requested id must exist.
    pub fn select(&self, ids: &[u32]) -> Result<Vec<EvaluationCriterion>, MissingCriteria> {
        let missing: Vec<u32> = ids
            .iter()
            .copied()
            .filter(|id| self.get(*id).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(MissingCriteria(missing));
        }
        Ok(self.matching(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rubric() -> Rubric {
        Rubric::from_json(
            r#"{"evaluation_criteria": [
                {"id": 1, "name": "(Multiple Choice) Most persuasive", "description": "pick one"},
                {"id": 2, "name": "(Ranking) Relevance", "description": "rank all"},
                {"id": 3, "name": "Tone", "description": "free text"}
            ]}"#,
            Path::new("rubric.json"),
        )
        .unwrap()
    }

    #[test]
    fn kind_from_name_prefix() {
        let r = rubric();
        assert_eq!(r.get(1).unwrap().kind(), CriterionKind::MultipleChoice);
        assert_eq!(r.get(2).unwrap().kind(), CriterionKind::Ranking);
        assert_eq!(r.get(3).unwrap().kind(), CriterionKind::Unknown);
    }

    #[test]
    fn matching_keeps_rubric_order() {
        let ids: Vec<u32> = rubric().matching(&[3, 1]).iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn select_reports_missing_ids() {
        let err = rubric().select(&[1, 9, 10]).unwrap_err();
        assert_eq!(err, MissingCriteria(vec![9, 10]));
        assert_eq!(rubric().select(&[2]).unwrap().len(), 1);
    }
}
