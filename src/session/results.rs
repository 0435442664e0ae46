use serde::Serialize;

use crate::question::{Answer, Question, MAX_OPTION_LETTERS};
use crate::session::devices::ResponseSet;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionTally {
    pub letter: char,
    pub label: String,
    pub votes: usize,
    pub is_correct: bool,
}

/// Aggregated votes of one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollResults {
    pub question_id: String,
    pub poll_id: Option<String>,
    pub options: Vec<OptionTally>,
    pub total_votes: usize,
    /// Devices known to the coordinator when the results were taken
    pub participants: usize,
    /// Only set when the question declares a correct answer
    pub correct_votes: Option<usize>,
}

impl PollResults {
    pub fn tally(
        question: &Question,
        responses: &ResponseSet,
        participants: usize,
        poll_id: Option<String>,
    ) -> Self {
        let expected = question.expected_answer();
        let mut options: Vec<OptionTally> = question
            .answer_letters()
            .into_iter()
            .take(question.option_count().min(MAX_OPTION_LETTERS))
            .enumerate()
            .map(|(index, letter)| OptionTally {
                letter,
                label: option_label(question, index),
                votes: 0,
                is_correct: expected.map(|a| a.option_index()) == Some(index),
            })
            .collect();

        for (_, answer) in responses.iter() {
            if let Some(tally) = options.get_mut(answer.option_index()) {
                tally.votes += 1;
            }
        }

        let correct_votes = expected.map(|expected| {
            responses
                .iter()
                .filter(|(_, answer)| *answer == expected)
                .count()
        });

        Self {
            question_id: question.id.clone(),
            poll_id,
            total_votes: responses.len(),
            options,
            participants,
            correct_votes,
        }
    }

    /// Share of known devices that voted, in percent.
    pub fn participation_rate(&self) -> f64 {
        if self.participants == 0 {
            return 0.0;
        }
        self.total_votes as f64 * 100.0 / self.participants as f64
    }

    pub fn votes_for(&self, answer: Answer) -> usize {
        self.options
            .get(answer.option_index())
            .map_or(0, |tally| tally.votes)
    }
}

fn option_label(question: &Question, index: usize) -> String {
    match question.options.get(index) {
        Some(label) => label.clone(),
        None if question.is_true_false() => {
            let label = if index == 0 { "Vrai" } else { "Faux" };
            label.to_string()
        }
        None => format!("Option {}", index + 1),
    }
}
