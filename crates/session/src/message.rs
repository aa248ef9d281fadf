use super::ids::MessageId;

/// Author of one timeline entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Bot,
}

/// One immutable timeline entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn new(id: MessageId, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            sender,
        }
    }

    pub fn user(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Sender::User, text)
    }

    pub fn bot(id: MessageId, text: impl Into<String>) -> Self {
        Self::new(id, Sender::Bot, text)
    }

    pub fn is_user(&self) -> bool {
        matches!(self.sender, Sender::User)
    }
}

/// Append-only message log; display order is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    messages: Vec<ChatMessage>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        debug_assert!(
            self.messages.iter().all(|existing| existing.id != message.id),
            "message id {} reused",
            message.id
        );
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_preserves_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.append(ChatMessage::user(MessageId::new(3), "first"));
        timeline.append(ChatMessage::bot(MessageId::new(1), "second"));
        timeline.append(ChatMessage::user(MessageId::new(2), "third"));

        let texts = timeline.iter().map(|message| message.text.as_str()).collect::<Vec<_>>();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(timeline.len(), 3);
        assert_eq!(timeline.last().map(|message| message.sender), Some(Sender::User));
    }

    #[test]
    fn constructors_tag_sender() {
        assert!(ChatMessage::user(MessageId::new(1), "hi").is_user());
        assert!(!ChatMessage::bot(MessageId::new(2), "hello").is_user());
    }
}
