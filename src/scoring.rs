use crate::models::{Answer, AnswerClass, Question, SubmittedAnswer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SelectedClass {
    Correct,
    ObviouslyWrong,
    Doubtful,
    Unknown,
}

impl From<AnswerClass> for SelectedClass {
    fn from(class: AnswerClass) -> Self {
        match class {
            AnswerClass::Correct => SelectedClass::Correct,
            AnswerClass::ObviouslyWrong => SelectedClass::ObviouslyWrong,
            AnswerClass::Doubtful => SelectedClass::Doubtful,
        }
    }
}

/// Per-answer breakdown returned with every submission. Lookup-derived
/// fields are absent when the submitted pair does not exist in the quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreDetail {
    pub question_id: String,
    pub selected_answer_id: String,
    pub selected_class: SelectedClass,
    pub points: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Scores submitted answers against the quiz they were drawn from.
///
/// A (question_id, answer_id) pair that does not exist in the quiz yields a
/// zero-point detail with an error note instead of failing the whole
/// submission. The raw score may be negative.
pub fn score_answers(
    questions: &[Question],
    answers: &[SubmittedAnswer],
) -> (i64, Vec<ScoreDetail>) {
    let mut options: HashMap<(&str, &str), &Answer> = HashMap::new();
    let mut correct_by_question: HashMap<&str, &Answer> = HashMap::new();
    for question in questions {
        for answer in &question.answers {
            options.insert((question.id.as_str(), answer.id.as_str()), answer);
            if answer.class == AnswerClass::Correct {
                correct_by_question.insert(question.id.as_str(), answer);
            }
        }
    }

    let mut raw_score = 0_i64;
    let mut details = Vec::with_capacity(answers.len());
    for submitted in answers {
        let key = (submitted.question_id.as_str(), submitted.answer_id.as_str());
        let Some(answer) = options.get(&key).copied() else {
            details.push(ScoreDetail {
                question_id: submitted.question_id.clone(),
                selected_answer_id: submitted.answer_id.clone(),
                selected_class: SelectedClass::Unknown,
                points: 0,
                selected_text: None,
                correct_answer_id: None,
                correct_answer_text: None,
                explanation: None,
                error: Some("answer not found".to_string()),
            });
            continue;
        };

        let points = answer.class.points();
        raw_score += points;
        let correct = correct_by_question
            .get(submitted.question_id.as_str())
            .copied();
        details.push(ScoreDetail {
            question_id: submitted.question_id.clone(),
            selected_answer_id: submitted.answer_id.clone(),
            selected_class: answer.class.into(),
            points,
            selected_text: Some(answer.text.clone()),
            correct_answer_id: correct.map(|a| a.id.clone()),
            correct_answer_text: correct.map(|a| a.text.clone()),
            explanation: Some(answer.explanation.clone()),
            error: None,
        });
    }

    (raw_score, details)
}

/// Floor of the product, so negative raw scores round toward minus infinity.
pub fn apply_multiplier(raw_score: i64, multiplier: f64) -> i64 {
    (raw_score as f64 * multiplier).floor() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::validate_quiz;
    use serde_json::json;

    fn sample_questions() -> Vec<Question> {
        let value = json!({
            "subject": "Kubernetes",
            "questions": [
                {
                    "id": "q1",
                    "question": "What schedules pods?",
                    "answers": [
                        {"id": "q1a1", "text": "The scheduler", "class": "correct", "explanation": "It assigns pods to nodes."},
                        {"id": "q1a2", "text": "The mail server", "class": "obviously_wrong", "explanation": "Unrelated."},
                        {"id": "q1a3", "text": "The kubelet", "class": "doubtful", "explanation": "Runs pods, does not place them."},
                        {"id": "q1a4", "text": "The controller manager", "class": "doubtful", "explanation": "Reconciles state."}
                    ]
                },
                {
                    "id": "q2",
                    "question": "What stores cluster state?",
                    "answers": [
                        {"id": "q2a1", "text": "etcd", "class": "correct", "explanation": "The cluster datastore."},
                        {"id": "q2a2", "text": "A spreadsheet", "class": "obviously_wrong", "explanation": "Unrelated."},
                        {"id": "q2a3", "text": "The api server", "class": "doubtful", "explanation": "Serves state, does not store it."},
                        {"id": "q2a4", "text": "Node local disk", "class": "doubtful", "explanation": "Only for workloads."}
                    ]
                },
                {
                    "id": "q3",
                    "question": "What exposes a set of pods?",
                    "answers": [
                        {"id": "q3a1", "text": "A service", "class": "correct", "explanation": "Stable virtual IP."},
                        {"id": "q3a2", "text": "A keyboard", "class": "obviously_wrong", "explanation": "Unrelated."},
                        {"id": "q3a3", "text": "An ingress", "class": "doubtful", "explanation": "HTTP routing, needs a service."},
                        {"id": "q3a4", "text": "A config map", "class": "doubtful", "explanation": "Configuration, not networking."}
                    ]
                }
            ]
        });
        validate_quiz(&value).unwrap().questions
    }

    fn submissions(pairs: &[(&str, &str)]) -> Vec<SubmittedAnswer> {
        pairs
            .iter()
            .map(|(q, a)| SubmittedAnswer {
                question_id: q.to_string(),
                answer_id: a.to_string(),
            })
            .collect()
    }

    #[test]
    fn all_correct_scores_thirty() {
        let questions = sample_questions();
        let answers = submissions(&[("q1", "q1a1"), ("q2", "q2a1"), ("q3", "q3a1")]);
        let (raw, details) = score_answers(&questions, &answers);
        assert_eq!(raw, 30);
        assert_eq!(details.len(), 3);
        assert!(details.iter().all(|d| d.points == 10));
        assert!(details.iter().all(|d| d.selected_class == SelectedClass::Correct));
    }

    #[test]
    fn obviously_wrong_detail_carries_correction() {
        let questions = sample_questions();
        let answers = submissions(&[("q1", "q1a2")]);
        let (raw, details) = score_answers(&questions, &answers);
        assert_eq!(raw, -5);
        let detail = &details[0];
        assert_eq!(detail.points, -5);
        assert_eq!(detail.selected_class, SelectedClass::ObviouslyWrong);
        assert_eq!(detail.selected_text.as_deref(), Some("The mail server"));
        assert_eq!(detail.correct_answer_id.as_deref(), Some("q1a1"));
        assert_eq!(detail.correct_answer_text.as_deref(), Some("The scheduler"));
        assert_eq!(detail.explanation.as_deref(), Some("Unrelated."));
        assert!(detail.error.is_none());
    }

    #[test]
    fn unknown_pair_recovers_with_zero_points() {
        let questions = sample_questions();
        let answers = submissions(&[("q1", "q1a1"), ("q2", "nope"), ("q9", "q1a1")]);
        let (raw, details) = score_answers(&questions, &answers);
        assert_eq!(raw, 10);
        for detail in &details[1..] {
            assert_eq!(detail.points, 0);
            assert_eq!(detail.selected_class, SelectedClass::Unknown);
            assert_eq!(detail.error.as_deref(), Some("answer not found"));
            assert!(detail.correct_answer_id.is_none());
            assert!(detail.selected_text.is_none());
        }
    }

    #[test]
    fn mixed_selection_can_go_negative() {
        let questions = sample_questions();
        let answers = submissions(&[("q1", "q1a2"), ("q2", "q2a2"), ("q3", "q3a3")]);
        let (raw, _) = score_answers(&questions, &answers);
        assert_eq!(raw, -10);
    }

    #[test]
    fn score_is_deterministic_and_order_independent() {
        let questions = sample_questions();
        let forward = submissions(&[("q1", "q1a3"), ("q2", "q2a1"), ("q3", "q3a2")]);
        let backward = submissions(&[("q3", "q3a2"), ("q2", "q2a1"), ("q1", "q1a3")]);
        let (raw_a, _) = score_answers(&questions, &forward);
        let (raw_b, _) = score_answers(&questions, &backward);
        let (raw_c, _) = score_answers(&questions, &forward);
        assert_eq!(raw_a, 5);
        assert_eq!(raw_a, raw_b);
        assert_eq!(raw_a, raw_c);
    }

    #[test]
    fn answer_order_does_not_affect_score() {
        let questions = sample_questions();
        let mut reordered = questions.clone();
        for question in &mut reordered {
            question.answers.reverse();
        }
        let answers = submissions(&[("q1", "q1a1"), ("q2", "q2a2"), ("q3", "q3a3")]);
        let (raw_a, _) = score_answers(&questions, &answers);
        let (raw_b, _) = score_answers(&reordered, &answers);
        assert_eq!(raw_a, 5);
        assert_eq!(raw_a, raw_b);
    }

    #[test]
    fn details_follow_submission_order() {
        let questions = sample_questions();
        let answers = submissions(&[("q3", "q3a1"), ("q1", "q1a1")]);
        let (_, details) = score_answers(&questions, &answers);
        assert_eq!(details[0].question_id, "q3");
        assert_eq!(details[1].question_id, "q1");
    }

    #[test]
    fn multiplier_doubles_negative_raw() {
        assert_eq!(apply_multiplier(-15, 2.0), -30);
    }

    #[test]
    fn multiplier_floors_toward_minus_infinity() {
        assert_eq!(apply_multiplier(-5, 1.5), -8);
        assert_eq!(apply_multiplier(5, 1.5), 7);
        assert_eq!(apply_multiplier(25, 2.0), 50);
        assert_eq!(apply_multiplier(0, 2.0), 0);
    }

    #[test]
    fn identity_multiplier_keeps_raw() {
        assert_eq!(apply_multiplier(-10, 1.0), -10);
        assert_eq!(apply_multiplier(30, 1.0), 30);
    }

    #[test]
    fn unknown_class_serializes_as_snake_case() {
        let value = serde_json::to_value(SelectedClass::ObviouslyWrong).unwrap();
        assert_eq!(value, json!("obviously_wrong"));
        let value = serde_json::to_value(SelectedClass::Unknown).unwrap();
        assert_eq!(value, json!("unknown"));
    }
}
