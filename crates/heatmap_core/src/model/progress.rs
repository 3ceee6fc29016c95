//! Progress definition model.
//!
//! # Responsibility
//! - Describe the ordered progress stages a team can reach per activity.
//! - Normalize stage scores given as fractions or percentage strings.
//!
//! # Invariants
//! - Titles are ordered by ascending score; the first title means "not
//!   started" and the last one means "completed".
//! - The lowest score is exactly `0.0` and the highest exactly `1.0`.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Name of one progress stage, e.g. `Started` or `Implemented`.
pub type ProgressTitle = String;

/// Raw score as written by dataset authors: `0.5` or `"50%"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreInput {
    Fraction(f64),
    Text(String),
}

/// One stage definition before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressStageInput {
    pub title: ProgressTitle,
    pub score: ScoreInput,
    #[serde(default)]
    pub definition: Option<String>,
}

/// One validated progress stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressStage {
    pub title: ProgressTitle,
    pub score: f64,
    pub definition: Option<String>,
}

/// Validated progress stages in ascending score order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressDefinitions {
    stages: Vec<ProgressStage>,
}

impl ProgressDefinitions {
    /// Validates and orders stage definitions.
    ///
    /// # Errors
    /// Collects every offending stage instead of stopping at the first one.
    pub fn new(inputs: Vec<ProgressStageInput>) -> Result<Self, ProgressDefinitionError> {
        let mut problems = Vec::new();
        let mut stages: Vec<ProgressStage> = Vec::with_capacity(inputs.len());

        for input in inputs {
            let title = input.title.trim().to_string();
            if title.is_empty() {
                problems.push("a progress stage has an empty title".to_string());
                continue;
            }
            if stages.iter().any(|stage| stage.title == title) {
                problems.push(format!("the progress stage '{title}' is defined twice"));
                continue;
            }
            match parse_score(&input.score) {
                Some(score) if (0.0..=1.0).contains(&score) => stages.push(ProgressStage {
                    title,
                    score,
                    definition: input.definition,
                }),
                Some(_) => problems.push(format!(
                    "the progress value for '{title}' must be between 0% and 100%"
                )),
                None => problems.push(format!("the progress value for '{title}' is not a number")),
            }
        }

        if !stages.is_empty() || problems.is_empty() {
            let min = stages.iter().map(|stage| stage.score).fold(f64::INFINITY, f64::min);
            let max = stages
                .iter()
                .map(|stage| stage.score)
                .fold(f64::NEG_INFINITY, f64::max);
            if min != 0.0 {
                problems.push("a stage for 0% completed must be specified".to_string());
            }
            if max != 1.0 {
                problems.push("a stage for 100% completed must be specified".to_string());
            }
        }

        if !problems.is_empty() {
            return Err(ProgressDefinitionError { problems });
        }

        stages.sort_by(|a, b| a.score.total_cmp(&b.score));
        Ok(Self { stages })
    }

    /// Titles in ascending score order.
    pub fn titles(&self) -> Vec<ProgressTitle> {
        self.stages.iter().map(|stage| stage.title.clone()).collect()
    }

    pub fn stages(&self) -> &[ProgressStage] {
        &self.stages
    }

    pub fn score(&self, title: &str) -> Option<f64> {
        self.stages
            .iter()
            .find(|stage| stage.title == title)
            .map(|stage| stage.score)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Renames one stage in place, keeping its position.
    pub fn rename(&mut self, old_title: &str, new_title: &str) -> bool {
        match self.stages.iter_mut().find(|stage| stage.title == old_title) {
            Some(stage) => {
                stage.title = new_title.to_string();
                true
            }
            None => false,
        }
    }
}

/// Parses a fraction or a percentage string into `[0, 1]` scale.
///
/// Range checking is left to the caller.
pub fn parse_score(input: &ScoreInput) -> Option<f64> {
    match input {
        ScoreInput::Fraction(value) if value.is_finite() => Some(*value),
        ScoreInput::Fraction(_) => None,
        ScoreInput::Text(text) => {
            let trimmed = text.trim();
            let (number, is_percentage) = match trimmed.strip_suffix('%') {
                Some(number) => (number.trim(), true),
                None => (trimmed, false),
            };
            let value = number.parse::<f64>().ok().filter(|value| value.is_finite())?;
            Some(if is_percentage { value / 100.0 } else { value })
        }
    }
}

/// Aggregated progress definition validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressDefinitionError {
    pub problems: Vec<String>,
}

impl Display for ProgressDefinitionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid progress definition:\n- {}",
            self.problems.join("\n- ")
        )
    }
}

impl Error for ProgressDefinitionError {}
