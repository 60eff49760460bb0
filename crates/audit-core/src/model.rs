//! Audit result model
//!
//! These types mirror the JSON schema the language model is instructed to
//! return. Deserialization enforces the structural invariants directly:
//! a blocker carries exactly three suggestions (a fixed-size array), and
//! category scores always expose all four categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Score used for any category the model leaves out of `categoryScores`.
///
/// This is a stopgap carried over from the hosted version of the service,
/// not a product decision.
pub const DEFAULT_CATEGORY_SCORE: f64 = 50.0;

/// Severity of a conversion blocker
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    #[serde(alias = "critical", alias = "CRITICAL")]
    Critical,
    #[serde(alias = "high", alias = "HIGH")]
    High,
    #[serde(alias = "medium", alias = "MEDIUM")]
    Medium,
    #[serde(alias = "low", alias = "LOW")]
    Low,
}

impl Priority {
    /// All priorities, most severe first. Report grouping follows this order.
    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Critical => "Critical",
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }

    /// Accent colour used for the group heading and left border
    pub fn accent_color(&self) -> &'static str {
        match self {
            Priority::Critical => "#c0392b",
            Priority::High => "#e67e22",
            Priority::Medium => "#d4ac0d",
            Priority::Low => "#27ae60",
        }
    }

    /// Background tint used for blocker cards in this group
    pub fn background_color(&self) -> &'static str {
        match self {
            Priority::Critical => "#fdecea",
            Priority::High => "#fef3e6",
            Priority::Medium => "#fdf9e3",
            Priority::Low => "#e9f7ef",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Content,
    Technical,
    #[serde(rename = "UXDesign", alias = "UX Design", alias = "UX/Design")]
    UxDesign,
    Performance,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Content,
        Category::Technical,
        Category::UxDesign,
        Category::Performance,
    ];

    /// Key used in the JSON schema
    pub fn key(&self) -> &'static str {
        match self {
            Category::Content => "Content",
            Category::Technical => "Technical",
            Category::UxDesign => "UXDesign",
            Category::Performance => "Performance",
        }
    }

    /// Human-readable label used in the report and charts
    pub fn label(&self) -> &'static str {
        match self {
            Category::Content => "Content",
            Category::Technical => "Technical",
            Category::UxDesign => "UX Design",
            Category::Performance => "Performance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

fn default_category_score() -> f64 {
    DEFAULT_CATEGORY_SCORE
}

/// Per-category scores (0-100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryScores {
    #[serde(rename = "Content", default = "default_category_score")]
    pub content: f64,
    #[serde(rename = "Technical", default = "default_category_score")]
    pub technical: f64,
    #[serde(rename = "UXDesign", default = "default_category_score")]
    pub ux_design: f64,
    #[serde(rename = "Performance", default = "default_category_score")]
    pub performance: f64,
}

impl Default for CategoryScores {
    fn default() -> Self {
        Self {
            content: DEFAULT_CATEGORY_SCORE,
            technical: DEFAULT_CATEGORY_SCORE,
            ux_design: DEFAULT_CATEGORY_SCORE,
            performance: DEFAULT_CATEGORY_SCORE,
        }
    }
}

impl CategoryScores {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Content => self.content,
            Category::Technical => self.technical,
            Category::UxDesign => self.ux_design,
            Category::Performance => self.performance,
        }
    }

    /// Scores in [`Category::ALL`] order
    pub fn iter(&self) -> impl Iterator<Item = (Category, f64)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

/// A single conversion blocker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blocker {
    pub issue: String,
    pub priority: Priority,
    pub category: Category,
    pub suggestions: [String; 3],
}

/// Complete analysis of one landing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResult {
    pub overall_score: f64,
    #[serde(default)]
    pub category_scores: CategoryScores,
    pub blockers: Vec<Blocker>,
    pub recommendations: Vec<String>,
}

impl AuditResult {
    /// Overall score rounded for display and persistence
    pub fn rounded_score(&self) -> u8 {
        self.overall_score.round().clamp(0.0, 100.0) as u8
    }

    /// Display form of the overall score, e.g. `72/100`
    pub fn score_label(&self) -> String {
        format!("{}/100", self.rounded_score())
    }

    /// Blockers grouped by priority, most severe first.
    ///
    /// Empty groups are omitted; order within a group is preserved.
    pub fn blockers_by_priority(&self) -> Vec<(Priority, Vec<&Blocker>)> {
        Priority::ALL
            .into_iter()
            .filter_map(|priority| {
                let group: Vec<&Blocker> = self
                    .blockers
                    .iter()
                    .filter(|b| b.priority == priority)
                    .collect();
                (!group.is_empty()).then_some((priority, group))
            })
            .collect()
    }
}
