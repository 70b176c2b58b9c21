//! The judge catalog: eight named review personas, preset bundles, and
//! the set of models a caller may request.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tribunal_core::{Result, TribunalError};

/// A judge persona available for reviews.
#[derive(Debug, Clone, Copy)]
pub struct JudgeSpec {
    /// Stable identifier used in requests and responses.
    pub id: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Emoji icon.
    pub icon: &'static str,
    /// One-line focus area, embedded in the system prompt.
    pub focus: &'static str,
    /// Example issues this judge treats as critical.
    pub triggers: &'static [&'static str],
    /// Weight of this judge's score in the overall mean.
    pub weight: f64,
}

/// All judges, in catalog order.
pub const JUDGES: &[JudgeSpec] = &[
    JudgeSpec {
        id: "correctness",
        name: "The Logician",
        icon: "\u{1f9ee}",
        focus: "logic errors, edge cases, unhandled error paths, and broken invariants",
        triggers: &["off-by-one errors", "unhandled error paths", "race conditions"],
        weight: 1.5,
    },
    JudgeSpec {
        id: "security",
        name: "The Sentinel",
        icon: "\u{1f6e1}\u{fe0f}",
        focus: "injection risks, authorization gaps, secret handling, and unsafe input",
        triggers: &["hardcoded credentials", "SQL injection", "unvalidated user input"],
        weight: 1.5,
    },
    JudgeSpec {
        id: "readability",
        name: "The Stylist",
        icon: "\u{270d}\u{fe0f}",
        focus: "naming, clarity, and how quickly a newcomer can follow the code",
        triggers: &["misleading names", "deeply nested control flow", "dead code"],
        weight: 0.8,
    },
    JudgeSpec {
        id: "architecture",
        name: "The Architect",
        icon: "\u{1f3db}\u{fe0f}",
        focus: "module boundaries, coupling, and whether the design will scale",
        triggers: &["circular dependencies", "god objects", "layering violations"],
        weight: 1.2,
    },
    JudgeSpec {
        id: "testing",
        name: "The Examiner",
        icon: "\u{1f52c}",
        focus: "test coverage, test quality, and whether failures would be caught",
        triggers: &[
            "untested error paths",
            "assertions on implementation details",
            "timing-dependent flaky tests",
        ],
        weight: 1.0,
    },
    JudgeSpec {
        id: "performance",
        name: "The Optimizer",
        icon: "\u{26a1}",
        focus: "algorithmic complexity, allocation pressure, and hot-path costs",
        triggers: &[
            "quadratic loops over unbounded input",
            "N+1 query patterns",
            "blocking calls on hot paths",
        ],
        weight: 1.0,
    },
    JudgeSpec {
        id: "maintainability",
        name: "The Caretaker",
        icon: "\u{1f9f9}",
        focus: "duplication, incidental complexity, and long-term upkeep cost",
        triggers: &["copy-pasted logic", "magic numbers", "sprawling multi-purpose functions"],
        weight: 0.9,
    },
    JudgeSpec {
        id: "docs",
        name: "The Scribe",
        icon: "\u{1f4dc}",
        focus: "documentation, API clarity, and usage examples",
        triggers: &["undocumented public APIs", "stale comments", "missing usage examples"],
        weight: 0.7,
    },
];

/// Models a caller may request. The first entry is the fallback when
/// no config default is set.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4.1",
    "gpt-4.1-mini",
    "o4-mini",
];

/// A named bundle of judges.
///
/// # Examples
///
/// ```
/// use tribunal_review::judges::Preset;
///
/// let preset: Preset = "comprehensive".parse().unwrap();
/// assert_eq!(preset, Preset::Comprehensive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    /// Three judges: the fastest useful review.
    Quick,
    /// Five judges: the default.
    Standard,
    /// All eight judges.
    Comprehensive,
    /// Caller supplies an explicit judge list.
    Custom,
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Preset::Quick => write!(f, "quick"),
            Preset::Standard => write!(f, "standard"),
            Preset::Comprehensive => write!(f, "comprehensive"),
            Preset::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(Preset::Quick),
            "standard" => Ok(Preset::Standard),
            "comprehensive" => Ok(Preset::Comprehensive),
            "custom" => Ok(Preset::Custom),
            other => Err(format!("unknown preset: {other}")),
        }
    }
}

const QUICK_IDS: &[&str] = &["correctness", "security", "readability"];
const STANDARD_IDS: &[&str] = &[
    "correctness",
    "security",
    "readability",
    "architecture",
    "testing",
];

/// Look up a judge by id.
pub fn find(id: &str) -> Option<&'static JudgeSpec> {
    JUDGES.iter().find(|j| j.id == id)
}

/// Resolve the judge panel for a request.
///
/// An explicit judge list (or `preset = custom`) takes priority over a
/// named preset; no preset at all means `standard`. The returned order
/// is the caller-requested order, which is also the order judges appear
/// in the final result.
///
/// # Errors
///
/// Returns [`TribunalError::Validation`] for an unknown judge id, an
/// empty custom list, or `preset = custom` without a judge list.
///
/// # Examples
///
/// ```
/// use tribunal_review::judges::{resolve, Preset};
///
/// let panel = resolve(Some(Preset::Quick), None).unwrap();
/// assert_eq!(panel.len(), 3);
///
/// let panel = resolve(None, None).unwrap();
/// assert_eq!(panel.len(), 5);
/// ```
pub fn resolve(
    preset: Option<Preset>,
    explicit: Option<&[String]>,
) -> Result<Vec<&'static JudgeSpec>> {
    if let Some(ids) = explicit {
        if ids.is_empty() {
            return Err(TribunalError::Validation(
                "judges list must not be empty".into(),
            ));
        }
        return ids
            .iter()
            .map(|id| {
                find(id).ok_or_else(|| TribunalError::Validation(format!("unknown judge: {id}")))
            })
            .collect();
    }

    let ids: &[&str] = match preset.unwrap_or(Preset::Standard) {
        Preset::Quick => QUICK_IDS,
        Preset::Standard => STANDARD_IDS,
        Preset::Comprehensive => return Ok(JUDGES.iter().collect()),
        Preset::Custom => {
            return Err(TribunalError::Validation(
                "preset \"custom\" requires a judges list".into(),
            ))
        }
    };
    // Preset ids are static and known-good.
    Ok(ids.iter().filter_map(|id| find(id)).collect())
}

/// Validate a requested model against [`AVAILABLE_MODELS`].
///
/// # Errors
///
/// Returns [`TribunalError::Validation`] for a model not in the catalog.
pub fn validate_model(model: &str) -> Result<()> {
    if AVAILABLE_MODELS.contains(&model) {
        Ok(())
    } else {
        Err(TribunalError::Validation(format!("unknown model: {model}")))
    }
}

/// The static catalog served by `GET /review`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    pub judges: Vec<CatalogJudge>,
    pub presets: Vec<CatalogPreset>,
    pub models: Vec<String>,
    pub default_model: String,
}

/// Catalog entry describing one judge.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogJudge {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub focus: String,
    pub weight: f64,
}

/// Catalog entry describing one preset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPreset {
    pub id: String,
    pub judges: Vec<String>,
}

/// Build the catalog with the configured default model.
pub fn catalog(default_model: &str) -> Catalog {
    Catalog {
        judges: JUDGES
            .iter()
            .map(|j| CatalogJudge {
                id: j.id.into(),
                name: j.name.into(),
                icon: j.icon.into(),
                focus: j.focus.into(),
                weight: j.weight,
            })
            .collect(),
        presets: vec![
            CatalogPreset {
                id: "quick".into(),
                judges: QUICK_IDS.iter().map(|s| (*s).into()).collect(),
            },
            CatalogPreset {
                id: "standard".into(),
                judges: STANDARD_IDS.iter().map(|s| (*s).into()).collect(),
            },
            CatalogPreset {
                id: "comprehensive".into(),
                judges: JUDGES.iter().map(|j| j.id.into()).collect(),
            },
        ],
        models: AVAILABLE_MODELS.iter().map(|s| (*s).into()).collect(),
        default_model: default_model.into(),
    }
}
