use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One probe in the multi-pass battery: a static domain query and how many
/// results to request for it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubQuery {
    pub query: String,
    pub n_results: usize,
}

/// Multi-pass retrieval plan: the trigger phrases that switch a query into
/// multi-pass mode, and the fixed battery of domain sub-queries issued when
/// one matches.
///
/// The battery is deliberately independent of the live user query — a small
/// set of static domain probes gives predictable coverage that a single
/// embedding lookup misses on broad questions. Loadable from JSON so the
/// phrases can be retuned per corpus without a rebuild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalPlan {
    /// Phrases that mark a query as needing comprehensive coverage.
    pub triggers: Vec<String>,
    /// Sub-queries issued, in order, for a multi-pass turn.
    pub battery: Vec<SubQuery>,
}

impl Default for RetrievalPlan {
    fn default() -> Self {
        let triggers = [
            // Project analysis
            "identify projects",
            "compare projects",
            "consolidate projects",
            "similar projects",
            "project overlap",
            "combine projects",
            "project consolidation",
            "merge projects",
            // Cross-domain analysis
            "across all capabilities",
            "across capabilities",
            "all domains",
            "cross-capability",
            "cross-domain",
            "enterprise-wide",
            // Comprehensive analysis
            "comprehensive analysis",
            "complete list",
            "all instances",
            "portfolio analysis",
            "strategic overview",
            "full inventory",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        // Tuned battery: 6 targeted probes cover the capability domains plus
        // a dependency sweep in roughly one second of sequential calls.
        let battery = [
            ("Change Control Management projects descriptions", 5),
            ("BOM PIM Management projects descriptions", 5),
            ("Requirements Management projects descriptions", 5),
            ("Data AI projects descriptions", 5),
            ("Design Management Collaboration projects", 5),
            ("project dependencies impact portfolio relationships", 5),
        ]
        .into_iter()
        .map(|(query, n_results)| SubQuery {
            query: query.to_string(),
            n_results,
        })
        .collect();

        Self { triggers, battery }
    }
}

impl RetrievalPlan {
    /// Load a plan from a JSON file, replacing the built-in defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read retrieval plan {}", path.display()))?;
        let plan: RetrievalPlan = serde_json::from_str(&data)
            .with_context(|| format!("Failed to parse retrieval plan {}", path.display()))?;
        plan.validate()?;
        Ok(plan)
    }

    /// Reject plans that cannot drive retrieval: an empty battery, a
    /// sub-query asking for zero results, or a blank trigger phrase
    /// (which would match every message).
    pub fn validate(&self) -> Result<()> {
        if self.battery.is_empty() {
            anyhow::bail!("Retrieval plan has an empty sub-query battery");
        }
        for sub in &self.battery {
            if sub.query.trim().is_empty() {
                anyhow::bail!("Retrieval plan contains a blank sub-query");
            }
            if sub.n_results == 0 {
                anyhow::bail!("Sub-query '{}' requests zero results", sub.query);
            }
        }
        if self.triggers.iter().any(|t| t.trim().is_empty()) {
            anyhow::bail!("Retrieval plan contains a blank trigger phrase");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_plan_is_valid() {
        let plan = RetrievalPlan::default();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.battery.len(), 6);
        assert!(plan.battery.iter().all(|s| s.n_results == 5));
    }

    #[test]
    fn test_validate_rejects_empty_battery() {
        let plan = RetrievalPlan {
            triggers: vec!["complete list".to_string()],
            battery: vec![],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_results() {
        let plan = RetrievalPlan {
            triggers: vec![],
            battery: vec![SubQuery {
                query: "governance projects".to_string(),
                n_results: 0,
            }],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_blank_trigger() {
        let mut plan = RetrievalPlan::default();
        plan.triggers.push("  ".to_string());
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_from_file_round_trip() {
        let plan = RetrievalPlan::default();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, serde_json::to_string_pretty(&plan).unwrap()).unwrap();

        let loaded = RetrievalPlan::from_file(&path).unwrap();
        assert_eq!(loaded.battery.len(), plan.battery.len());
        assert_eq!(loaded.triggers, plan.triggers);
    }

    #[test]
    fn test_from_file_rejects_invalid_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.json");
        std::fs::write(&path, r#"{"triggers":[],"battery":[]}"#).unwrap();
        assert!(RetrievalPlan::from_file(&path).is_err());
    }
}
