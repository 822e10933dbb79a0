use serde::Serialize;

use crate::chat::ChatTurn;

/// Ordered, append-only conversation history for one running session.
///
/// Turns are never edited or removed individually; [`Session::clear`] is the
/// only way to shrink it.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct Session {
    #[serde(rename = "messages")]
    turns: Vec<ChatTurn>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn clear(&mut self) {
        if !self.turns.is_empty() {
            tracing::debug!(turns = self.turns.len(), "clearing session");
        }
        self.turns.clear();
    }

    /// Read-only snapshot, oldest turn first.
    pub fn all(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChatTurn> {
        self.turns.iter()
    }
}

impl<'a> IntoIterator for &'a Session {
    type Item = &'a ChatTurn;
    type IntoIter = std::slice::Iter<'a, ChatTurn>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
