/// One question and the answer it received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

/// Ordered question/answer history of a conversation
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn save_turn(&mut self, question: impl Into<String>, answer: impl Into<String>) {
        self.turns.push(Turn {
            question: question.into(),
            answer: answer.into(),
        });
    }

    #[inline]
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    #[inline]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Transcript used by the condense prompt, one `Human:`/`AI:` line each
    #[inline]
    pub fn buffer_string(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("Human: {}\nAI: {}", turn.question, turn.answer))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
