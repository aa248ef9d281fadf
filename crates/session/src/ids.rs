use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

// Macro keeps the ID wrappers structurally identical so they stay interchangeable in tests.
macro_rules! define_session_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self::new(value)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                raw.trim().parse::<u64>().map(Self)
            }
        }
    };
}

define_session_id!(MessageId);
define_session_id!(DocumentId);

/// Source of session-unique identifiers.
///
/// Every call must return a value never returned before in the same session.
pub trait IdIssuer: Send + Sync {
    fn next_id(&self) -> u64;
}

/// Monotonic counter, the default issuer.
#[derive(Debug)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    pub const fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdIssuer for SequentialIds {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn sequential_ids_never_repeat() {
        let ids = SequentialIds::new();
        let issued = (0..1_000).map(|_| ids.next_id()).collect::<Vec<_>>();

        assert_eq!(issued.first(), Some(&1));
        assert!(issued.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn sequential_ids_are_unique_across_threads() {
        let ids = Arc::new(SequentialIds::starting_at(100));
        let workers = (0..4)
            .map(|_| {
                let ids = Arc::clone(&ids);
                std::thread::spawn(move || (0..250).map(|_| ids.next_id()).collect::<Vec<_>>())
            })
            .collect::<Vec<_>>();

        let mut seen = HashSet::new();
        for worker in workers {
            for id in worker.join().unwrap() {
                assert!(id >= 100);
                assert!(seen.insert(id), "id {id} issued twice");
            }
        }
        assert_eq!(seen.len(), 1_000);
    }

    #[test]
    fn typed_ids_parse_and_display() {
        let id: DocumentId = " 42 ".parse().unwrap();
        assert_eq!(id, DocumentId::new(42));
        assert_eq!(id.to_string(), "42");
        assert!("forty-two".parse::<MessageId>().is_err());
    }
}
