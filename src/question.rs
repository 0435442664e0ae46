use serde::{Deserialize, Serialize};

/// Highest option count a single OMBEA keypad can answer (A..H).
pub const MAX_OPTION_LETTERS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    SingleChoice,
    TrueFalse,
}

/// Exam question as supplied by the surrounding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub options: Vec<String>,
    /// Seconds allowed for voting
    #[serde(default)]
    pub time_limit: Option<u32>,
    /// Letter of the expected answer, when known
    #[serde(default)]
    pub correct_answer: Option<String>,
    #[serde(default)]
    pub is_eliminatory: bool,
}

impl Question {
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        question_type: QuestionType,
        options: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            question_type,
            options,
            time_limit: None,
            correct_answer: None,
            is_eliminatory: false,
        }
    }

    pub fn with_time_limit(mut self, seconds: u32) -> Self {
        self.time_limit = Some(seconds);
        self
    }

    pub fn with_correct_answer(mut self, letter: impl Into<String>) -> Self {
        self.correct_answer = Some(letter.into());
        self
    }

    pub fn is_true_false(&self) -> bool {
        self.question_type == QuestionType::TrueFalse
    }

    /// Number of options announced to the hardware for this question.
    pub fn option_count(&self) -> usize {
        if self.is_true_false() {
            2
        } else {
            self.options.len()
        }
    }

    /// Letters a keypad may legitimately send for this question.
    pub fn answer_letters(&self) -> Vec<char> {
        let count = if self.is_true_false() {
            2
        } else {
            self.option_count().clamp(1, MAX_OPTION_LETTERS)
        };
        ('A'..).take(count).collect()
    }

    /// The declared correct answer, parsed against this question.
    pub fn expected_answer(&self) -> Option<Answer> {
        self.correct_answer
            .as_deref()
            .and_then(|raw| Answer::parse(raw, self))
    }
}

/// A vote decided at the boundary: true/false questions never carry letters past the
/// parser, and choice questions carry the zero-based option index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Answer {
    True,
    False,
    OptionIndex(usize),
}

impl Answer {
    /// Parse a raw keypad value for `question`. Returns `None` when the value cannot be
    /// an answer to that question.
    pub fn parse(raw: &str, question: &Question) -> Option<Self> {
        let value = raw.trim();

        if question.is_true_false() {
            return match value.to_ascii_lowercase().as_str() {
                "a" | "true" | "vrai" => Some(Answer::True),
                "b" | "false" | "faux" => Some(Answer::False),
                _ => None,
            };
        }

        let mut chars = value.chars();
        let letter = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() || !letter.is_ascii_uppercase() {
            return None;
        }

        let index = (letter as u8 - b'A') as usize;
        if index < question.option_count().min(MAX_OPTION_LETTERS) {
            Some(Answer::OptionIndex(index))
        } else {
            None
        }
    }

    /// Canonical keypad letter for this answer.
    pub fn letter(&self) -> char {
        match self {
            Answer::True => 'A',
            Answer::False => 'B',
            Answer::OptionIndex(index) => (b'A' + *index as u8) as char,
        }
    }

    /// Zero-based position of the answer in the question's option list.
    pub fn option_index(&self) -> usize {
        match self {
            Answer::True => 0,
            Answer::False => 1,
            Answer::OptionIndex(index) => *index,
        }
    }
}

impl std::fmt::Display for Answer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}
