use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// The kinds of question a survey form can contain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    /// Short free text.
    Text,
    /// Long free text.
    Textarea,
    /// Single selection from a dropdown.
    Select,
    /// Single selection from radio buttons.
    Radio,
}

impl QuestionType {
    /// Does this type require an option list? (And conversely: free-text
    /// types must not carry one.)
    pub fn requires_options(self) -> bool {
        matches!(self, Self::Select | Self::Radio)
    }
}

impl From<QuestionType> for Bson {
    fn from(ty: QuestionType) -> Self {
        to_bson(&ty).expect("Serialisation is infallible")
    }
}
