use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod event;
pub mod session;
pub mod violation;

/// Quiz definition as supplied by the external quiz store. Read-only to the
/// engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub title: String,
    pub questions: Vec<Question>,
    /// Overall time limit in minutes. `None` means untimed.
    pub time_limit_minutes: Option<u32>,
    pub security_level: SecurityLevel,
    /// Maximum number of completed attempts per user. 0 = unlimited.
    pub max_attempts: u32,
    pub available_from: Option<DateTime<Utc>>,
    pub available_until: Option<DateTime<Utc>>,
    pub show_results: ResultVisibility,
    pub allow_review: bool,
}

impl Quiz {
    pub fn time_limit_seconds(&self) -> Option<u64> {
        self.time_limit_minutes.map(|m| u64::from(m) * 60)
    }

    pub fn question_by_id(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn is_available_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(from) = self.available_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.available_until {
            if now > until {
                return false;
            }
        }
        true
    }

    /// Structural validation of an externally supplied definition. The engine
    /// refuses to start a session on a quiz that fails these checks.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.questions.is_empty() {
            anyhow::bail!("quiz {} has no questions", self.id);
        }

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                anyhow::bail!("quiz {} has duplicate question id {}", self.id, question.id);
            }
            question.validate()?;
        }

        if let (Some(from), Some(until)) = (self.available_from, self.available_until) {
            if until < from {
                anyhow::bail!("quiz {} availability window is inverted", self.id);
            }
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub kind: QuestionKind,
    pub prompt: String,
    pub image_url: Option<String>,
    pub points: u32,
    /// Ordered choices; empty for open-ended questions.
    pub choices: Vec<Choice>,
    /// Absent for open-ended questions, which are graded manually downstream.
    pub correct: Option<CorrectAnswer>,
}

impl Question {
    fn validate(&self) -> anyhow::Result<()> {
        let choice_ids: HashSet<&str> = self.choices.iter().map(|c| c.id.as_str()).collect();
        if choice_ids.len() != self.choices.len() {
            anyhow::bail!("question {} has duplicate choice ids", self.id);
        }

        match (self.kind, &self.correct) {
            (QuestionKind::OpenEnded, None) => Ok(()),
            (QuestionKind::OpenEnded, Some(_)) => {
                anyhow::bail!(
                    "question {} is open-ended but declares an automatic answer",
                    self.id
                )
            }
            (
                QuestionKind::SingleChoice | QuestionKind::TrueFalse,
                Some(CorrectAnswer::Single(id)),
            ) => {
                if !choice_ids.contains(id.as_str()) {
                    anyhow::bail!("question {} answer {} is not a choice", self.id, id);
                }
                Ok(())
            }
            (QuestionKind::MultipleChoice, Some(CorrectAnswer::Multiple(ids))) => {
                if ids.is_empty() {
                    anyhow::bail!("question {} has an empty correct set", self.id);
                }
                for id in ids {
                    if !choice_ids.contains(id.as_str()) {
                        anyhow::bail!("question {} answer {} is not a choice", self.id, id);
                    }
                }
                Ok(())
            }
            _ => anyhow::bail!(
                "question {} answer specification does not match its kind",
                self.id
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    OpenEnded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectAnswer {
    Single(String),
    Multiple(BTreeSet<String>),
}

/// Configured strictness governing which integrity violations trigger
/// warnings versus forced submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    None,
    Low,
    Medium,
    High,
    Extreme,
}

impl SecurityLevel {
    /// Whether the integrity monitor runs at all for this level.
    pub fn monitored(self) -> bool {
        self >= SecurityLevel::Medium
    }

    /// Copy/paste/context-menu are suppressed at any level above Low.
    pub fn suppresses_clipboard(self) -> bool {
        self > SecurityLevel::Low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultVisibility {
    Immediate,
    AfterGrading,
    Hidden,
}

/// A user's answer to one question. Multi-select questions use the set
/// variant; everything else is a single value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    Single(String),
    Multiple(BTreeSet<String>),
}
