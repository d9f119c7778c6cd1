use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::{
    common::{QuestionType, SurveyState},
    db::question::{NewQuestion, Question},
    mongodb::Id,
};

/// A question specification, as submitted by an admin.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionSpec {
    pub label: String,
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub is_personal_data: bool,
    #[serde(default)]
    pub position: u32,
}

impl TryFrom<QuestionSpec> for NewQuestion {
    type Error = Error;

    /// Validate the spec: the label must be non-blank, and an option list is
    /// required for choice types and forbidden for free-text types.
    fn try_from(spec: QuestionSpec) -> Result<Self, Self::Error> {
        if spec.label.trim().is_empty() {
            return Err(Error::BadRequest(
                "Question label must not be blank".to_string(),
            ));
        }
        let has_options = spec
            .options
            .as_ref()
            .map(|opts| !opts.is_empty())
            .unwrap_or(false);
        if spec.question_type.requires_options() && !has_options {
            return Err(Error::BadRequest(format!(
                "Question type {:?} requires a non-empty option list",
                spec.question_type
            )));
        }
        if !spec.question_type.requires_options() && spec.options.is_some() {
            return Err(Error::BadRequest(format!(
                "Question type {:?} does not take options",
                spec.question_type
            )));
        }
        Ok(Self {
            label: spec.label,
            question_type: spec.question_type,
            options: spec.options,
            is_required: spec.is_required,
            is_personal_data: spec.is_personal_data,
            position: spec.position,
        })
    }
}

/// A question as presented to respondents and admins.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: Id,
    pub label: String,
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    pub is_required: bool,
    pub is_personal_data: bool,
    pub position: u32,
}

impl From<Question> for QuestionView {
    fn from(question: Question) -> Self {
        Self {
            id: question.id,
            label: question.question.label,
            question_type: question.question.question_type,
            options: question.question.options,
            is_required: question.question.is_required,
            is_personal_data: question.question.is_personal_data,
            position: question.question.position,
        }
    }
}

/// The public form description: everything a respondent needs to render and
/// fill in the survey.
#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsForSubmission {
    pub survey_name: String,
    pub status: SurveyState,
    pub questions: Vec<QuestionView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(question_type: QuestionType, options: Option<Vec<String>>) -> QuestionSpec {
        QuestionSpec {
            label: "A question".to_string(),
            question_type,
            options,
            is_required: false,
            is_personal_data: false,
            position: 0,
        }
    }

    #[test]
    fn choice_types_require_options() {
        assert!(NewQuestion::try_from(spec(QuestionType::Select, None)).is_err());
        assert!(NewQuestion::try_from(spec(QuestionType::Radio, Some(vec![]))).is_err());
        assert!(NewQuestion::try_from(spec(
            QuestionType::Select,
            Some(vec!["A".to_string(), "B".to_string()])
        ))
        .is_ok());
    }

    #[test]
    fn free_text_types_forbid_options() {
        assert!(NewQuestion::try_from(spec(
            QuestionType::Text,
            Some(vec!["A".to_string()])
        ))
        .is_err());
        assert!(NewQuestion::try_from(spec(QuestionType::Textarea, None)).is_ok());
    }

    #[test]
    fn blank_labels_are_rejected() {
        let mut s = spec(QuestionType::Text, None);
        s.label = "  ".to_string();
        assert!(NewQuestion::try_from(s).is_err());
    }
}
