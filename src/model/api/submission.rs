use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    db::{
        question::Question,
        response::{NewRawResponse, RawAnswer, RawResponse, RawResponseCore},
    },
    mongodb::Id,
};

/// One answer within a submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerSpec {
    pub question_id: Id,
    pub answer_text: String,
    /// Consent to disclose this answer; only honoured on personal-data
    /// questions.
    #[serde(default)]
    pub is_disclosure_agreed: bool,
}

/// A full survey submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub answers: Vec<AnswerSpec>,
}

impl SubmitRequest {
    /// Validate this submission against the survey's question set and
    /// convert it into a storable raw response.
    ///
    /// A survey with no questions cannot be answered at all. Otherwise,
    /// every required question must have a non-blank answer. Answers to
    /// unknown question ids are dropped rather than rejected, so a stale
    /// client form degrades gracefully after an admin deletes a question.
    /// Blank answers to optional questions are dropped too, and the consent
    /// flag is forced to false on anything that is not personal data.
    pub fn into_response(
        self,
        questions: &HashMap<Id, &Question>,
        now: DateTime<Utc>,
    ) -> Result<NewRawResponse> {
        if questions.is_empty() {
            return Err(Error::BadRequest(
                "Survey has no questions yet".to_string(),
            ));
        }

        let mut answers = Vec::new();
        for spec in self.answers {
            let Some(question) = questions.get(&spec.question_id) else {
                continue;
            };
            let answer_text = spec.answer_text.trim().to_string();
            if answer_text.is_empty() {
                continue;
            }
            if let Some(options) = &question.options {
                if !options.contains(&answer_text) {
                    return Err(Error::BadRequest(format!(
                        "'{answer_text}' is not an option for question '{}'",
                        question.label
                    )));
                }
            }
            answers.push(RawAnswer {
                question_id: spec.question_id,
                answer_text,
                is_disclosure_agreed: question.is_personal_data && spec.is_disclosure_agreed,
            });
        }

        for question in questions.values() {
            if question.is_required
                && !answers.iter().any(|a| a.question_id == question.id)
            {
                return Err(Error::BadRequest(format!(
                    "Required question '{}' was not answered",
                    question.label
                )));
            }
        }

        Ok(RawResponseCore {
            submitted_at: now,
            answers,
        })
    }
}

/// Acknowledgement of a stored submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub response_id: Id,
    pub submitted_at: DateTime<Utc>,
}

/// One row in the admin's raw response listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct RawResponseSummary {
    pub id: Id,
    pub submitted_at: DateTime<Utc>,
    pub answer_count: usize,
}

impl From<&RawResponse> for RawResponseSummary {
    fn from(response: &RawResponse) -> Self {
        Self {
            id: response.id,
            submitted_at: response.submitted_at,
            answer_count: response.answers.len(),
        }
    }
}

/// One answer within a raw response detail view, labelled with its question.
#[derive(Debug, Serialize, Deserialize)]
pub struct AnswerView {
    pub question_id: Id,
    /// The question label at view time, or `None` if the question was since
    /// deleted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_label: Option<String>,
    pub answer_text: String,
    pub is_disclosure_agreed: bool,
}

/// The admin's view of one full raw response.
#[derive(Debug, Serialize, Deserialize)]
pub struct RawResponseDetail {
    pub id: Id,
    pub submitted_at: DateTime<Utc>,
    pub answers: Vec<AnswerView>,
}

impl RawResponseDetail {
    pub fn new(response: RawResponse, questions: &HashMap<Id, &Question>) -> Self {
        let answers = response
            .response
            .answers
            .into_iter()
            .map(|answer| AnswerView {
                question_id: answer.question_id,
                question_label: questions
                    .get(&answer.question_id)
                    .map(|q| q.label.clone()),
                answer_text: answer.answer_text,
                is_disclosure_agreed: answer.is_disclosure_agreed,
            })
            .collect();
        Self {
            id: response.id,
            submitted_at: response.response.submitted_at,
            answers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question_map(questions: &[Question]) -> HashMap<Id, &Question> {
        questions.iter().map(|q| (q.id, q)).collect()
    }

    fn answer(question_id: Id, text: &str) -> AnswerSpec {
        AnswerSpec {
            question_id,
            answer_text: text.to_string(),
            is_disclosure_agreed: false,
        }
    }

    #[test]
    fn surveys_without_questions_reject_all_submissions() {
        let request = SubmitRequest { answers: vec![] };
        assert!(matches!(
            request.into_response(&HashMap::new(), Utc::now()),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn missing_required_answers_reject_the_whole_submission() {
        let questions = vec![Question::example()];
        let request = SubmitRequest { answers: vec![] };
        assert!(matches!(
            request.into_response(&question_map(&questions), Utc::now()),
            Err(Error::BadRequest(_))
        ));
    }

    #[test]
    fn blank_answers_do_not_satisfy_required_questions() {
        let questions = vec![Question::example()];
        let request = SubmitRequest {
            answers: vec![answer(questions[0].id, "   ")],
        };
        assert!(request
            .into_response(&question_map(&questions), Utc::now())
            .is_err());
    }

    #[test]
    fn unknown_question_ids_are_dropped_not_rejected() {
        let questions = vec![Question::example()];
        let request = SubmitRequest {
            answers: vec![
                answer(questions[0].id, "Fewer meetings."),
                answer(Id::new(), "Answer to a deleted question."),
            ],
        };
        let response = request
            .into_response(&question_map(&questions), Utc::now())
            .unwrap();
        assert_eq!(response.answers.len(), 1);
        assert_eq!(response.answers[0].question_id, questions[0].id);
    }

    #[test]
    fn consent_only_sticks_to_personal_data_questions() {
        let questions = vec![Question::example(), Question::example_personal()];
        let request = SubmitRequest {
            answers: vec![
                AnswerSpec {
                    question_id: questions[0].id,
                    answer_text: "Fewer meetings.".to_string(),
                    is_disclosure_agreed: true,
                },
                AnswerSpec {
                    question_id: questions[1].id,
                    answer_text: "Sam Doe".to_string(),
                    is_disclosure_agreed: true,
                },
            ],
        };
        let response = request
            .into_response(&question_map(&questions), Utc::now())
            .unwrap();
        let by_id: HashMap<_, _> = response
            .answers
            .iter()
            .map(|a| (a.question_id, a))
            .collect();
        assert!(!by_id[&questions[0].id].is_disclosure_agreed);
        assert!(by_id[&questions[1].id].is_disclosure_agreed);
    }

    #[test]
    fn choice_answers_must_be_valid_options() {
        let questions = vec![Question::example_select()];
        let request = SubmitRequest {
            answers: vec![answer(questions[0].id, "Marketing")],
        };
        assert!(request
            .into_response(&question_map(&questions), Utc::now())
            .is_err());

        let questions2 = vec![Question::example_select()];
        let request = SubmitRequest {
            answers: vec![answer(questions2[0].id, "Engineering")],
        };
        assert!(request
            .into_response(&question_map(&questions2), Utc::now())
            .is_ok());
    }
}
