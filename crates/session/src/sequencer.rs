use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Order in which settled replies reach the timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyOrdering {
    /// Append each reply the moment its request settles.
    #[default]
    Completion,
    /// Hold a reply back until every earlier request has settled.
    Submission,
}

/// Position of one request in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Releases settled replies according to a [`ReplyOrdering`].
#[derive(Debug)]
pub struct ReplySequencer<T> {
    ordering: ReplyOrdering,
    next_ticket: u64,
    next_release: u64,
    parked: BTreeMap<u64, T>,
}

impl<T> ReplySequencer<T> {
    pub fn new(ordering: ReplyOrdering) -> Self {
        Self {
            ordering,
            next_ticket: 0,
            next_release: 0,
            parked: BTreeMap::new(),
        }
    }

    pub fn issue(&mut self) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        ticket
    }

    /// Records the reply for `ticket` and returns every reply now ready, in release order.
    pub fn settle(&mut self, ticket: Ticket, reply: T) -> Vec<T> {
        match self.ordering {
            ReplyOrdering::Completion => vec![reply],
            ReplyOrdering::Submission => {
                self.parked.insert(ticket.0, reply);

                let mut ready = Vec::new();
                while let Some(reply) = self.parked.remove(&self.next_release) {
                    ready.push(reply);
                    self.next_release += 1;
                }
                ready
            }
        }
    }

    /// Replies settled but still waiting on an earlier ticket.
    pub fn parked(&self) -> usize {
        self.parked.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_ordering_releases_immediately() {
        let mut sequencer = ReplySequencer::new(ReplyOrdering::Completion);
        let first = sequencer.issue();
        let second = sequencer.issue();

        assert_eq!(sequencer.settle(second, "second"), ["second"]);
        assert_eq!(sequencer.settle(first, "first"), ["first"]);
        assert_eq!(sequencer.parked(), 0);
    }

    #[test]
    fn submission_ordering_buffers_out_of_order_replies() {
        let mut sequencer = ReplySequencer::new(ReplyOrdering::Submission);
        let first = sequencer.issue();
        let second = sequencer.issue();
        let third = sequencer.issue();
        assert!(first < second && second < third);

        assert!(sequencer.settle(third, "third").is_empty());
        assert!(sequencer.settle(second, "second").is_empty());
        assert_eq!(sequencer.parked(), 2);

        assert_eq!(sequencer.settle(first, "first"), ["first", "second", "third"]);
        assert_eq!(sequencer.parked(), 0);

        let fourth = sequencer.issue();
        assert_eq!(sequencer.settle(fourth, "fourth"), ["fourth"]);
    }

    #[test]
    fn ordering_parses_from_lowercase_names() {
        let ordering: ReplyOrdering = serde_json::from_str("\"submission\"").unwrap();
        assert_eq!(ordering, ReplyOrdering::Submission);
        assert_eq!(serde_json::to_string(&ReplyOrdering::Completion).unwrap(), "\"completion\"");
    }
}
