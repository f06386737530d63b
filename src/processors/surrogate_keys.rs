use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Where numbering starts when a stage runs against existing storage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurrogateKeyMode {
    /// Continue after the largest key already stored, so keys stay unique
    /// across runs.
    #[default]
    Continue,
    /// Always start at 1, regardless of stored rows.
    Reset,
}

impl std::str::FromStr for SurrogateKeyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continue" => Ok(SurrogateKeyMode::Continue),
            "reset" => Ok(SurrogateKeyMode::Reset),
            other => Err(format!("unknown surrogate key mode '{}'", other)),
        }
    }
}

/// Hands out contiguous integer keys, one range per batch.
#[derive(Debug, Clone)]
pub struct SurrogateKeyGenerator {
    next: i64,
}

impl SurrogateKeyGenerator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn for_mode(mode: SurrogateKeyMode, max_existing: Option<i64>) -> Self {
        let next = match (mode, max_existing) {
            (SurrogateKeyMode::Continue, Some(max)) => max + 1,
            _ => 1,
        };
        Self { next }
    }

    /// Reserve `len` keys. Successive calls return adjacent ranges.
    pub fn assign(&mut self, len: usize) -> Range<i64> {
        let start = self.next;
        self.next += len as i64;
        start..self.next
    }

    pub fn peek(&self) -> i64 {
        self.next
    }
}

impl Default for SurrogateKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}
