//! Error types for search configuration.

/// A [`SearchConfig`](crate::SearchConfig) or [`SearchParams`](crate::SearchParams)
/// value that the search cannot run with.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("thread count must be between 1 and {max}, got {threads}")]
    ThreadCount { threads: usize, max: usize },
    #[error("hash size must be between 1 and {max} MB, got {mb}")]
    HashSize { mb: usize, max: usize },
    /// A margin or divisor that must be strictly positive is not.
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: i64 },
    /// A per-depth table decreases where it must not.
    #[error("{table} must be non-decreasing in depth (index {index})")]
    NonMonotonic { table: &'static str, index: usize },
    #[error("tablebase probe depth must be at least 1, got {depth}")]
    TablebaseProbeDepth { depth: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = ConfigError::ThreadCount { threads: 0, max: 256 };
        assert_eq!(err.to_string(), "thread count must be between 1 and 256, got 0");
        let err = ConfigError::NonPositive { name: "pawn_value", value: -3 };
        assert_eq!(err.to_string(), "pawn_value must be positive, got -3");
    }
}
