use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::db::models::{Submission, TaskQuestion};
use crate::db::types::{SubmissionStatus, TaskType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct Grade {
    pub(crate) score: i32,
    pub(crate) total: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FileRef {
    pub(crate) key: String,
    pub(crate) name: String,
    pub(crate) size: i64,
    pub(crate) sha256: String,
    pub(crate) mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubmissionPayload {
    Answers(HashMap<String, i32>),
    Text(String),
    File(FileRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ReviewDecision {
    Approve,
    Reject,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum GradingError {
    #[error("{} question(s) left unanswered", .missing.len())]
    IncompleteAnswer { missing: Vec<String> },
    #[error("answer references unknown question {0}")]
    UnknownQuestion(String),
    #[error("option {index} is out of range for question {question_id}")]
    OptionOutOfRange { question_id: String, index: i32 },
    #[error("{task_type} tasks do not accept this payload")]
    PayloadMismatch { task_type: &'static str },
    #[error("text answer must not be empty")]
    EmptyText,
    #[error("test task has no questions")]
    NoQuestions,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum TransitionError {
    #[error("resubmission is not allowed for this task")]
    DuplicateSubmission,
    #[error("submission is {0} and cannot be reviewed")]
    NotPending(&'static str),
    #[error("submission has been superseded by a newer attempt")]
    Superseded,
}

pub(crate) fn validate_payload(
    task_type: TaskType,
    payload: &SubmissionPayload,
) -> Result<(), GradingError> {
    match (task_type, payload) {
        (TaskType::Test, SubmissionPayload::Answers(_)) => Ok(()),
        (TaskType::Text, SubmissionPayload::Text(text)) if text.trim().is_empty() => {
            Err(GradingError::EmptyText)
        }
        (TaskType::Text, SubmissionPayload::Text(_)) => Ok(()),
        (TaskType::File, SubmissionPayload::File(_)) => Ok(()),
        (task_type, _) => Err(GradingError::PayloadMismatch { task_type: task_type.as_str() }),
    }
}

/// Scores a test. Either every question is scored or nothing is.
pub(crate) fn grade_test(
    questions: &[TaskQuestion],
    answers: &HashMap<String, i32>,
) -> Result<Grade, GradingError> {
    if questions.is_empty() {
        return Err(GradingError::NoQuestions);
    }

    let missing: Vec<String> = questions
        .iter()
        .filter(|question| !answers.contains_key(&question.id))
        .map(|question| question.id.clone())
        .collect();
    if !missing.is_empty() {
        return Err(GradingError::IncompleteAnswer { missing });
    }

    if let Some(unknown) = answers.keys().find(|id| !questions.iter().any(|q| &q.id == *id)) {
        return Err(GradingError::UnknownQuestion(unknown.clone()));
    }

    let mut score = 0;
    for question in questions {
        let chosen = answers[&question.id];
        if chosen < 0 || chosen as usize >= question.options.0.len() {
            return Err(GradingError::OptionOutOfRange {
                question_id: question.id.clone(),
                index: chosen,
            });
        }
        if chosen == question.correct_answer {
            score += 1;
        }
    }

    Ok(Grade { score, total: questions.len() as i32 })
}

/// Tests resolve on the spot; other types wait for a reviewer when asked to.
pub(crate) fn initial_status(task_type: TaskType, requires_approval: bool) -> SubmissionStatus {
    match task_type {
        TaskType::Test => SubmissionStatus::Approved,
        TaskType::File | TaskType::Text if requires_approval => SubmissionStatus::Pending,
        TaskType::File | TaskType::Text => SubmissionStatus::Approved,
    }
}

pub(crate) fn check_resubmission(
    prior: Option<&Submission>,
    allow_resubmission: bool,
) -> Result<(), TransitionError> {
    match prior {
        Some(_) if !allow_resubmission => Err(TransitionError::DuplicateSubmission),
        _ => Ok(()),
    }
}

pub(crate) fn review_transition(
    submission: &Submission,
    decision: ReviewDecision,
) -> Result<SubmissionStatus, TransitionError> {
    if !submission.is_current {
        return Err(TransitionError::Superseded);
    }
    if submission.status != SubmissionStatus::Pending {
        return Err(TransitionError::NotPending(submission.status.as_str()));
    }

    Ok(match decision {
        ReviewDecision::Approve => SubmissionStatus::Approved,
        ReviewDecision::Reject => SubmissionStatus::Rejected,
    })
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionReview {
    pub(crate) question_id: String,
    pub(crate) question: String,
    pub(crate) options: Vec<String>,
    pub(crate) user_answer: Option<i32>,
    pub(crate) correct_answer: i32,
    pub(crate) is_correct: bool,
}

pub(crate) fn review_answers(
    questions: &[TaskQuestion],
    answers: Option<&HashMap<String, i32>>,
) -> Vec<QuestionReview> {
    questions
        .iter()
        .map(|question| {
            let user_answer = answers.and_then(|answers| answers.get(&question.id).copied());
            QuestionReview {
                question_id: question.id.clone(),
                question: question.question.clone(),
                options: question.options.0.clone(),
                user_answer,
                correct_answer: question.correct_answer,
                is_correct: user_answer == Some(question.correct_answer),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::types::Json;
    use time::macros::datetime;

    fn question(id: &str, correct: i32) -> TaskQuestion {
        TaskQuestion {
            id: id.to_string(),
            task_id: "t".to_string(),
            question: format!("Question {id}"),
            options: Json(vec!["a".into(), "b".into(), "c".into()]),
            correct_answer: correct,
            order_index: 0,
        }
    }

    fn answers(pairs: &[(&str, i32)]) -> HashMap<String, i32> {
        pairs.iter().map(|(id, idx)| (id.to_string(), *idx)).collect()
    }

    fn submission(status: SubmissionStatus, is_current: bool) -> Submission {
        let at = datetime!(2026-03-01 09:00:00);
        Submission {
            id: "s".to_string(),
            user_id: "u".to_string(),
            task_id: "t".to_string(),
            attempt_number: 1,
            is_current,
            status,
            answers: None,
            text_content: Some("essay".to_string()),
            file_key: None,
            file_name: None,
            file_size: None,
            file_sha256: None,
            mime_type: None,
            score: None,
            total: None,
            feedback: None,
            reviewed_by: None,
            reviewed_at: None,
            submitted_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn grading_is_deterministic() {
        let questions = vec![question("q1", 0), question("q2", 1), question("q3", 2), question("q4", 0)];
        let submitted = answers(&[("q1", 0), ("q2", 1), ("q3", 2), ("q4", 1)]);

        let first = grade_test(&questions, &submitted).expect("graded");
        let second = grade_test(&questions, &submitted).expect("graded");

        assert_eq!(first, Grade { score: 3, total: 4 });
        assert_eq!(first, second);
    }

    #[test]
    fn partial_answers_are_rejected_before_scoring() {
        let questions = vec![question("q1", 0), question("q2", 1)];
        let result = grade_test(&questions, &answers(&[("q1", 0)]));

        assert_eq!(result, Err(GradingError::IncompleteAnswer { missing: vec!["q2".to_string()] }));
    }

    #[test]
    fn missing_answers_win_over_stray_keys() {
        let questions = vec![question("q1", 0), question("q2", 1)];
        let result = grade_test(&questions, &answers(&[("q1", 0), ("zz", 1)]));

        assert_eq!(result, Err(GradingError::IncompleteAnswer { missing: vec!["q2".to_string()] }));
    }

    #[test]
    fn unknown_questions_and_bad_options_are_rejected() {
        let questions = vec![question("q1", 0)];

        assert_eq!(
            grade_test(&questions, &answers(&[("q1", 0), ("zz", 1)])),
            Err(GradingError::UnknownQuestion("zz".to_string()))
        );
        assert_eq!(
            grade_test(&questions, &answers(&[("q1", 7)])),
            Err(GradingError::OptionOutOfRange { question_id: "q1".to_string(), index: 7 })
        );
        assert_eq!(grade_test(&[], &answers(&[])), Err(GradingError::NoQuestions));
    }

    #[test]
    fn payload_must_match_task_type() {
        assert!(validate_payload(TaskType::Test, &SubmissionPayload::Answers(HashMap::new())).is_ok());
        assert_eq!(
            validate_payload(TaskType::Test, &SubmissionPayload::Text("hi".into())),
            Err(GradingError::PayloadMismatch { task_type: "test" })
        );
        assert_eq!(
            validate_payload(TaskType::Text, &SubmissionPayload::Text("   ".into())),
            Err(GradingError::EmptyText)
        );
    }

    #[test]
    fn initial_status_follows_task_kind() {
        assert_eq!(initial_status(TaskType::Test, true), SubmissionStatus::Approved);
        assert_eq!(initial_status(TaskType::File, true), SubmissionStatus::Pending);
        assert_eq!(initial_status(TaskType::Text, true), SubmissionStatus::Pending);
        assert_eq!(initial_status(TaskType::Text, false), SubmissionStatus::Approved);
    }

    #[test]
    fn resubmission_guard() {
        let prior = submission(SubmissionStatus::Rejected, true);

        assert_eq!(check_resubmission(Some(&prior), false), Err(TransitionError::DuplicateSubmission));
        assert!(check_resubmission(Some(&prior), true).is_ok());
        assert!(check_resubmission(None, false).is_ok());
    }

    #[test]
    fn reviews_only_move_current_pending_attempts() {
        let pending = submission(SubmissionStatus::Pending, true);
        assert_eq!(review_transition(&pending, ReviewDecision::Approve), Ok(SubmissionStatus::Approved));
        assert_eq!(review_transition(&pending, ReviewDecision::Reject), Ok(SubmissionStatus::Rejected));

        let approved = submission(SubmissionStatus::Approved, true);
        assert_eq!(
            review_transition(&approved, ReviewDecision::Reject),
            Err(TransitionError::NotPending("approved"))
        );

        let superseded = submission(SubmissionStatus::Pending, false);
        assert_eq!(review_transition(&superseded, ReviewDecision::Approve), Err(TransitionError::Superseded));
    }

    #[test]
    fn answer_review_marks_each_question() {
        let questions = vec![question("q1", 0), question("q2", 1), question("q3", 2)];
        let submitted = answers(&[("q1", 0), ("q2", 2)]);

        let reviewed = review_answers(&questions, Some(&submitted));
        let marks: Vec<(Option<i32>, bool)> =
            reviewed.iter().map(|item| (item.user_answer, item.is_correct)).collect();
        assert_eq!(marks, vec![(Some(0), true), (Some(2), false), (None, false)]);
    }
}
