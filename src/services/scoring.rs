//! Scoring is a pure function of answers and quiz definition: no side
//! effects, so the live completion display and the final submission can both
//! call it and agree.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{AnswerValue, CorrectAnswer, Question, QuestionKind, Quiz};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreSummary {
    pub score: u32,
    pub total_points: u32,
    pub answered_count: usize,
    pub question_count: usize,
}

impl ScoreSummary {
    /// Fraction of questions touched, independent of correctness. Distinct
    /// from the score fraction.
    pub fn completion_fraction(&self) -> f64 {
        if self.question_count == 0 {
            0.0
        } else {
            self.answered_count as f64 / self.question_count as f64
        }
    }

    pub fn score_fraction(&self) -> f64 {
        if self.total_points == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total_points)
        }
    }
}

pub fn score(answers: &HashMap<String, AnswerValue>, quiz: &Quiz) -> ScoreSummary {
    let mut earned = 0;
    let mut total = 0;
    let mut answered = 0;

    for question in &quiz.questions {
        total += question.points;
        if let Some(answer) = answers.get(&question.id) {
            answered += 1;
            if awards_full_points(question, answer) {
                earned += question.points;
            }
        }
    }

    ScoreSummary {
        score: earned,
        total_points: total,
        answered_count: answered,
        question_count: quiz.questions.len(),
    }
}

/// All-or-nothing per question: extra selections and missing selections both
/// yield zero. Open-ended answers always defer to manual grading.
fn awards_full_points(question: &Question, answer: &AnswerValue) -> bool {
    match (question.kind, &question.correct) {
        (QuestionKind::OpenEnded, _) => false,
        (
            QuestionKind::SingleChoice | QuestionKind::TrueFalse,
            Some(CorrectAnswer::Single(correct_id)),
        ) => matches!(answer, AnswerValue::Single(selected) if selected == correct_id),
        (QuestionKind::MultipleChoice, Some(CorrectAnswer::Multiple(correct_set))) => {
            matches!(answer, AnswerValue::Multiple(selected) if selected == correct_set)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Choice, ResultVisibility, SecurityLevel};
    use std::collections::BTreeSet;

    fn choices(ids: &[&str]) -> Vec<Choice> {
        ids.iter()
            .map(|id| Choice {
                id: id.to_string(),
                text: format!("choice {id}"),
            })
            .collect()
    }

    fn single(id: &str, correct: &str, points: u32) -> Question {
        Question {
            id: id.to_string(),
            kind: QuestionKind::SingleChoice,
            prompt: "pick one".to_string(),
            image_url: None,
            points,
            choices: choices(&["0", "1", "2"]),
            correct: Some(CorrectAnswer::Single(correct.to_string())),
        }
    }

    fn multi(id: &str, correct: &[&str], points: u32) -> Question {
        Question {
            id: id.to_string(),
            kind: QuestionKind::MultipleChoice,
            prompt: "pick all that apply".to_string(),
            image_url: None,
            points,
            choices: choices(&["a", "b", "c"]),
            correct: Some(CorrectAnswer::Multiple(
                correct.iter().map(|s| s.to_string()).collect(),
            )),
        }
    }

    fn open_ended(id: &str, points: u32) -> Question {
        Question {
            id: id.to_string(),
            kind: QuestionKind::OpenEnded,
            prompt: "explain".to_string(),
            image_url: None,
            points,
            choices: Vec::new(),
            correct: None,
        }
    }

    fn quiz(questions: Vec<Question>) -> Quiz {
        Quiz {
            id: "quiz-1".to_string(),
            title: "Scoring quiz".to_string(),
            questions,
            time_limit_minutes: None,
            security_level: SecurityLevel::None,
            max_attempts: 0,
            available_from: None,
            available_until: None,
            show_results: ResultVisibility::Immediate,
            allow_review: true,
        }
    }

    fn set(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn two_single_choice_questions_full_marks() {
        let quiz = quiz(vec![single("q1", "0", 2), single("q2", "1", 2)]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), AnswerValue::Single("0".to_string()));
        answers.insert("q2".to_string(), AnswerValue::Single("1".to_string()));

        let summary = score(&answers, &quiz);
        assert_eq!(summary.score, 4);
        assert_eq!(summary.total_points, 4);
        assert_eq!(summary.answered_count, 2);
    }

    #[test]
    fn unanswered_question_still_counts_toward_total() {
        let quiz = quiz(vec![single("q1", "0", 2), single("q2", "1", 2)]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), AnswerValue::Single("0".to_string()));

        let summary = score(&answers, &quiz);
        assert_eq!(summary.score, 2);
        assert_eq!(summary.total_points, 4);
        assert!((summary.completion_fraction() - 0.5).abs() < f64::EPSILON);
        assert!((summary.score_fraction() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn multiple_choice_has_no_partial_credit() {
        let quiz = quiz(vec![multi("q1", &["a", "b"], 5)]);

        // Missing a selection scores zero.
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), AnswerValue::Multiple(set(&["a"])));
        assert_eq!(score(&answers, &quiz).score, 0);

        // Extra selection also scores zero.
        answers.insert(
            "q1".to_string(),
            AnswerValue::Multiple(set(&["a", "b", "c"])),
        );
        assert_eq!(score(&answers, &quiz).score, 0);

        // Exact set equality scores full points.
        answers.insert("q1".to_string(), AnswerValue::Multiple(set(&["a", "b"])));
        assert_eq!(score(&answers, &quiz).score, 5);
    }

    #[test]
    fn open_ended_contributes_zero_but_counts_as_answered() {
        let quiz = quiz(vec![open_ended("q1", 10), single("q2", "0", 2)]);
        let mut answers = HashMap::new();
        answers.insert(
            "q1".to_string(),
            AnswerValue::Single("my long essay".to_string()),
        );
        answers.insert("q2".to_string(), AnswerValue::Single("0".to_string()));

        let summary = score(&answers, &quiz);
        assert_eq!(summary.score, 2);
        assert_eq!(summary.total_points, 12);
        assert_eq!(summary.answered_count, 2);
    }

    #[test]
    fn scoring_is_deterministic() {
        let quiz = quiz(vec![single("q1", "0", 2), multi("q2", &["a"], 3)]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), AnswerValue::Single("0".to_string()));
        answers.insert("q2".to_string(), AnswerValue::Multiple(set(&["a"])));

        let first = score(&answers, &quiz);
        let second = score(&answers, &quiz);
        assert_eq!(first, second);
        assert_eq!(first.score, 5);
    }

    #[test]
    fn wrong_answer_shape_scores_zero() {
        let quiz = quiz(vec![single("q1", "0", 2)]);
        let mut answers = HashMap::new();
        answers.insert("q1".to_string(), AnswerValue::Multiple(set(&["0"])));
        assert_eq!(score(&answers, &quiz).score, 0);
    }
}
