use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single scoring criterion within a rubric
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Criterion {
    /// Unique name, used as the key in score and rationale maps
    pub name: String,
    /// Relative weight (0-100); weights need not sum to 100
    pub weight: u32,
    /// What the judges should look for
    pub description: String,
}

/// Weighted set of named criteria plus the shared scoring scale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Rubric {
    pub criteria: Vec<Criterion>,
    /// (min, max) score for every criterion
    pub scale: (f64, f64),
}

impl Rubric {
    /// Sum of criterion weights. Recomputed on every call; weights may be
    /// edited between judging runs so this is never cached.
    pub fn total_weight(&self) -> u32 {
        self.criteria.iter().map(|c| c.weight).sum()
    }

    /// Criterion names in rubric order
    pub fn criterion_names(&self) -> Vec<&str> {
        self.criteria.iter().map(|c| c.name.as_str()).collect()
    }

    /// Check structural invariants: non-empty, unique names, sane scale
    pub fn validate(&self) -> Result<()> {
        if self.criteria.is_empty() {
            bail!("Rubric has no criteria");
        }

        let mut seen = HashSet::new();
        for criterion in &self.criteria {
            if !seen.insert(criterion.name.as_str()) {
                bail!("Duplicate criterion name in rubric: {}", criterion.name);
            }
        }

        let (min, max) = self.scale;
        if !(min < max) {
            bail!("Invalid rubric scale: min {} must be below max {}", min, max);
        }

        Ok(())
    }
}

impl Default for Rubric {
    fn default() -> Self {
        Self {
            criteria: vec![
                Criterion {
                    name: "Innovation & Originality".to_string(),
                    weight: 30,
                    description: "How novel or creative the project idea is.".to_string(),
                },
                Criterion {
                    name: "Technical Implementation".to_string(),
                    weight: 30,
                    description: "The complexity and quality of the engineering (skillful use of tech, solid code, etc.).".to_string(),
                },
                Criterion {
                    name: "Impact & Usefulness".to_string(),
                    weight: 20,
                    description: "Potential impact, usefulness, or value of the solution.".to_string(),
                },
                Criterion {
                    name: "Presentation & Communication".to_string(),
                    weight: 20,
                    description: "Clarity and effectiveness of the demo and pitch in conveying the idea.".to_string(),
                },
            ],
            scale: (1.0, 10.0),
        }
    }
}
