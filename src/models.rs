use serde::{Deserialize, Serialize};

pub const QUESTIONS_PER_QUIZ: usize = 3;
pub const ANSWERS_PER_QUESTION: usize = 4;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnswerClass {
    Correct,
    ObviouslyWrong,
    Doubtful,
}

impl AnswerClass {
    pub fn points(self) -> i64 {
        match self {
            AnswerClass::Correct => 10,
            AnswerClass::ObviouslyWrong => -5,
            AnswerClass::Doubtful => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: String,
    pub text: String,
    // Older clients echo the field back as "answer_class".
    #[serde(alias = "answer_class")]
    pub class: AnswerClass,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    #[serde(rename = "question")]
    pub text: String,
    pub answers: Vec<Answer>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    #[serde(default)]
    pub subject: String,
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question_id: String,
    pub answer_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("missing 'questions' field")]
    MissingQuestions,
    #[error("expected 3 questions, got {0}")]
    QuestionCount(usize),
    #[error("question {number} missing 'answers'")]
    MissingAnswers { number: usize },
    #[error("question {number} has {count} answers, expected 4")]
    AnswerCount { number: usize, count: usize },
    #[error("question {number}: must have exactly 1 correct answer")]
    CorrectCount { number: usize },
    #[error("question {number}: must have exactly 1 obviously_wrong answer")]
    ObviouslyWrongCount { number: usize },
    #[error("question {number}: must have exactly 2 doubtful answers")]
    DoubtfulCount { number: usize },
    #[error("cannot decode quiz: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Checks the raw model payload against the fixed quiz shape and decodes it.
///
/// Counts are checked on the raw JSON first so that a wrong question or
/// answer count is reported as such instead of as a decode failure.
pub fn validate_quiz(value: &serde_json::Value) -> Result<Quiz, ValidationError> {
    let questions = value
        .get("questions")
        .and_then(|v| v.as_array())
        .ok_or(ValidationError::MissingQuestions)?;
    if questions.len() != QUESTIONS_PER_QUIZ {
        return Err(ValidationError::QuestionCount(questions.len()));
    }
    for (i, question) in questions.iter().enumerate() {
        let number = i + 1;
        let answers = question
            .get("answers")
            .and_then(|v| v.as_array())
            .ok_or(ValidationError::MissingAnswers { number })?;
        if answers.len() != ANSWERS_PER_QUESTION {
            return Err(ValidationError::AnswerCount {
                number,
                count: answers.len(),
            });
        }
    }

    let quiz: Quiz = serde_json::from_value(value.clone())?;

    for (i, question) in quiz.questions.iter().enumerate() {
        let number = i + 1;
        let count_of = |class: AnswerClass| {
            question
                .answers
                .iter()
                .filter(|a| a.class == class)
                .count()
        };
        if count_of(AnswerClass::Correct) != 1 {
            return Err(ValidationError::CorrectCount { number });
        }
        if count_of(AnswerClass::ObviouslyWrong) != 1 {
            return Err(ValidationError::ObviouslyWrongCount { number });
        }
        if count_of(AnswerClass::Doubtful) != 2 {
            return Err(ValidationError::DoubtfulCount { number });
        }
    }

    Ok(quiz)
}
