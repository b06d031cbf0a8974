use super::{ChatRole, ChatTurn};

/// Oldest turns are dropped past this many.
pub const MAX_HISTORY_TURNS: usize = 20;

pub const COACH_INSTRUCTION: &str = "You are a friendly, concise strength and nutrition coach. \
Answer in plain text, keep replies under 200 words, and never give medical diagnoses.";

pub fn routine_prompt(request: &str) -> String {
    format!(
        "Create workout routines for this request: \"{request}\".\n\
Reply with JSON only, no prose, in exactly this shape:\n\
{{\"routines\":[{{\"name\":string,\"description\":string,\"exercises\":[\
{{\"name\":string,\"sets\":integer,\"reps\":integer,\"weight\":number|null,\"restSeconds\":integer|null}}]}}]}}\n\
Weights are in kilograms. Use at least one exercise per routine."
    )
}

pub const FOOD_PHOTO_PROMPT: &str = "Identify every food item in this photo and estimate its \
nutrition. Reply with JSON only, no prose, in exactly this shape:\n\
{\"items\":[{\"name\":string,\"calories\":number,\"protein\":number,\"carbs\":number,\
\"fats\":number,\"quantity\":number,\"unit\":string}],\"notes\":string}\n\
Protein, carbs and fats are grams. Use an empty items list when no food is visible.";

/// The most recent turns, capped at [`MAX_HISTORY_TURNS`].
pub fn trim_history(history: &[ChatTurn]) -> &[ChatTurn] {
    let start = history.len().saturating_sub(MAX_HISTORY_TURNS);
    &history[start..]
}

/// Flattens history into a plain transcript, used as context for models without multi-turn
/// input.
pub fn history_context(history: &[ChatTurn]) -> String {
    trim_history(history)
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                ChatRole::User => "User",
                ChatRole::Model => "Coach",
            };
            format!("{speaker}: {}", turn.text.trim())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_latest_turns() {
        let history: Vec<ChatTurn> = (0..25).map(|i| ChatTurn::user(format!("m{i}"))).collect();
        let trimmed = trim_history(&history);
        assert_eq!(trimmed.len(), MAX_HISTORY_TURNS);
        assert_eq!(trimmed[0].text, "m5");
    }

    #[test]
    fn context_labels_speakers() {
        let history = vec![ChatTurn::user("How many sets?"), ChatTurn::model(" Three. ")];
        assert_eq!(history_context(&history), "User: How many sets?\nCoach: Three.");
    }

    #[test]
    fn routine_prompt_embeds_request() {
        assert!(routine_prompt("3 day split").contains("\"3 day split\""));
    }
}
