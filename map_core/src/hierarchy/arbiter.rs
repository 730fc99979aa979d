//! Arbitration seam for ambiguous hierarchy violations.

use async_trait::async_trait;
use map_rules::MapNode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ArbiterError;

/// How to fix a node that contains something at its own level or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyDecision {
    /// Move the offending children up to the violator's own parent.
    ConvertChild,
    /// Raise the violator a level and give it a connector child.
    Promote,
}

impl FromStr for HierarchyDecision {
    type Err = ArbiterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "convert_child" | "convert" => Ok(HierarchyDecision::ConvertChild),
            "promote" | "upgrade" => Ok(HierarchyDecision::Promote),
            other => Err(ArbiterError::InvalidResponse(other.to_string())),
        }
    }
}

/// External collaborator that decides how each violation is repaired.
#[async_trait]
pub trait HierarchyArbiter: Send + Sync {
    /// Decide for `violator`, given one representative offending `child`.
    async fn arbitrate(
        &self,
        violator: &MapNode,
        child: &MapNode,
    ) -> Result<HierarchyDecision, ArbiterError>;
}

/// Arbiter that always gives the same answer.
#[derive(Debug, Clone, Copy)]
pub struct FixedArbiter(pub HierarchyDecision);

#[async_trait]
impl HierarchyArbiter for FixedArbiter {
    async fn arbitrate(
        &self,
        _violator: &MapNode,
        _child: &MapNode,
    ) -> Result<HierarchyDecision, ArbiterError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decision() {
        assert_eq!("convert_child".parse::<HierarchyDecision>().unwrap(), HierarchyDecision::ConvertChild);
        assert_eq!(" Promote ".parse::<HierarchyDecision>().unwrap(), HierarchyDecision::Promote);
        assert!(matches!(
            "merge".parse::<HierarchyDecision>(),
            Err(ArbiterError::InvalidResponse(_))
        ));
    }
}
