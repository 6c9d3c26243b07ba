use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A single call against one registered model.
///
/// The two variants correspond to the two request patterns the dispatcher
/// serves: `Count` fetches and scores a batch of benchmark tasks, `Pair`
/// scores one literal input directly. The variant is resolved at the
/// boundary; nothing downstream inspects runtime types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Request {
    /// Benchmark mode: pull `quantity` tasks from the remote service,
    /// score them, and submit the answers for grading.
    Count { quantity: u64 },

    /// Single-shot mode: score one literal text (pair) without the remote
    /// round trip. `text2` is only meaningful for pairwise models.
    Pair {
        text1: String,
        #[serde(default)]
        text2: Option<String>,
    },
}

impl Request {
    /// Benchmark-mode request for `quantity` tasks.
    pub fn count(quantity: u64) -> Self {
        Self::Count { quantity }
    }

    /// Single-shot request over a pair of texts.
    pub fn pair(text1: impl Into<String>, text2: impl Into<String>) -> Self {
        Self::Pair {
            text1: text1.into(),
            text2: Some(text2.into()),
        }
    }

    /// Single-shot request over one text.
    pub fn single(text1: impl Into<String>) -> Self {
        Self::Pair {
            text1: text1.into(),
            text2: None,
        }
    }

    /// Boundary validation, performed before any channel interaction.
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            Request::Count { quantity } if *quantity == 0 => Err(Error::validation(
                "quantity must be an integer greater than zero",
            )),
            Request::Pair { text1, .. } if text1.trim().is_empty() => {
                Err(Error::validation("text1 must not be empty"))
            }
            _ => Ok(()),
        }
    }
}
