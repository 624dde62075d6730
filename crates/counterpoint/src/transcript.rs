//! Conversation transcript for a single generation.
//!
//! One transcript per (item, model, condition). It only grows.

use crate::providers::ChatMessage;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<ChatMessage>,
}

impl Transcript {
    pub fn with_system(system_prompt: impl Into<String>) -> Self {
        Self {
            turns: vec![ChatMessage::system(system_prompt)],
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::assistant(content));
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::Role;

    #[test]
    fn turns_are_appended_in_order() {
        let mut t = Transcript::with_system("sys");
        t.push_user("q");
        t.push_assistant("a");
        let roles: Vec<Role> = t.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant]);
        assert_eq!(t.messages().len(), 3);
    }
}
