//! Prompt assembly: persona, windowed history, current user turn.

use murmur_core::types::Role;
use murmur_providers::{Prompt, PromptRole};

use crate::context::HistoryTurn;

/// Truncate history to at most `max` turns, dropping the oldest first.
/// The persona and the current turn are never part of `history` and so are
/// never dropped.
pub fn apply_window(history: &[HistoryTurn], max: usize) -> &[HistoryTurn] {
    let begin = history.len().saturating_sub(max);
    &history[begin..]
}

/// Build the structured prompt for one turn: system persona first, history
/// turns oldest-to-newest, the current user turn last. History text is
/// included verbatim.
pub fn assemble(
    agent_name: &str,
    system_prompt: &str,
    history: &[HistoryTurn],
    user_text: &str,
) -> Prompt {
    let mut prompt = Prompt::default();

    let persona = format!(
        "You are {agent_name}.\n\n{system_prompt}\n\n\
         You are having a conversation with the user. Be friendly and \
         cooperative. If the user's message has no relation to your role as \
         {agent_name}, apologize and say you can only help in that matter."
    );
    prompt.push(PromptRole::System, persona);

    for turn in history {
        let role = match turn.role {
            Role::User => PromptRole::User,
            Role::Agent => PromptRole::Agent,
        };
        prompt.push(role, turn.text.clone());
    }

    prompt.push(PromptRole::User, user_text);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_of(n: usize) -> Vec<HistoryTurn> {
        (1..=n)
            .map(|i| HistoryTurn {
                role: if i % 2 == 1 { Role::User } else { Role::Agent },
                text: format!("turn {i}"),
            })
            .collect()
    }

    #[test]
    fn test_segment_order_persona_history_current() {
        let history = history_of(4);
        let prompt = assemble("Geography Expert", "You know capitals.", &history, "now");

        assert_eq!(prompt.segments.len(), 6);
        assert_eq!(prompt.segments[0].role, PromptRole::System);
        assert!(prompt.segments[0].content.contains("You are Geography Expert."));
        assert!(prompt.segments[0].content.contains("You know capitals."));

        // History in original creation order, verbatim.
        assert_eq!(prompt.segments[1].role, PromptRole::User);
        assert_eq!(prompt.segments[1].content, "turn 1");
        assert_eq!(prompt.segments[2].role, PromptRole::Agent);
        assert_eq!(prompt.segments[4].content, "turn 4");

        // Current turn last.
        assert_eq!(prompt.segments[5].role, PromptRole::User);
        assert_eq!(prompt.segments[5].content, "now");
    }

    #[test]
    fn test_window_under_cap_keeps_everything() {
        let history = history_of(3);
        assert_eq!(apply_window(&history, 10), &history[..]);
    }

    #[test]
    fn test_window_over_cap_drops_oldest_first() {
        let history = history_of(5);
        let windowed = apply_window(&history, 2);
        let texts: Vec<&str> = windowed.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["turn 4", "turn 5"]);
    }

    #[test]
    fn test_windowed_prompt_always_retains_current_turn() {
        let history = history_of(20);
        let windowed = apply_window(&history, 0);
        let prompt = assemble("A", "B", windowed, "the current turn");
        assert_eq!(prompt.segments.len(), 2);
        assert_eq!(prompt.segments.last().unwrap().content, "the current turn");
    }
}
