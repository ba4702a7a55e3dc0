use std::collections::HashMap;

use super::message::ToolCall;

/// Result of merging a tool call into a [`ToolCallSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted(usize),
    Replaced(usize),
}

/// Tool calls of one assistant turn, ordered by first appearance.
///
/// Re-receiving an id replaces the stored call in place, so progressively
/// completed argument strings never produce duplicates.
#[derive(Debug, Clone, Default)]
pub struct ToolCallSet {
    calls: Vec<ToolCall>,
    positions: HashMap<String, usize>,
}

impl ToolCallSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, call: ToolCall) -> Upsert {
        if let Some(&position) = self.positions.get(&call.id) {
            self.calls[position] = call;
            return Upsert::Replaced(position);
        }

        let position = self.calls.len();
        self.positions.insert(call.id.clone(), position);
        self.calls.push(call);
        Upsert::Inserted(position)
    }

    pub fn get(&self, id: &str) -> Option<&ToolCall> {
        self.positions.get(id).map(|&position| &self.calls[position])
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolCall> {
        self.calls.iter()
    }

    /// Function names joined for status display, in call order
    pub fn names(&self) -> String {
        self.calls
            .iter()
            .map(|call| call.function_name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_vec(&self) -> Vec<ToolCall> {
        self.calls.clone()
    }
}
