use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: Uuid,
    pub section_id: Uuid,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default = "default_marks")]
    pub marks: i32,
    pub prompt: QuestionPrompt,
    #[serde(flatten)]
    pub details: QuestionDetails,
}

fn default_marks() -> i32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionPrompt {
    pub text: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleCorrect,
    MultiCorrect,
    Coding,
    Descriptive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuestionDetails {
    Choice(ChoiceDetails),
    Coding(CodingDetails),
    Descriptive(DescriptiveDetails),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceDetails {
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: Uuid,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodingDetails {
    pub problem_statement: String,
    pub constraints: Option<String>,
    pub sample_tests: Vec<SampleTest>,
    pub languages: Vec<LanguageOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleTest {
    pub input: String,
    pub expected_output: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageOption {
    pub language_id: i32,
    pub name: String,
    #[serde(default)]
    pub template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DescriptiveDetails {
    pub min_words: Option<i32>,
}

impl Question {
    /// The single dispatch point on question shape. Anything rendering or
    /// saving a question matches on this exhaustively.
    pub fn coding_details(&self) -> Option<&CodingDetails> {
        match &self.details {
            QuestionDetails::Coding(d) => Some(d),
            _ => None,
        }
    }

    pub fn options(&self) -> Option<&[AnswerOption]> {
        match &self.details {
            QuestionDetails::Choice(d) => Some(&d.options),
            _ => None,
        }
    }

    pub fn is_multi_correct(&self) -> bool {
        self.question_type == QuestionType::MultiCorrect
    }
}
