//! Fan-out result aggregation

use unipredict_core::{Listing, TradingError};

/// One platform's failed contribution to a fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformFailure {
    pub platform: String,
    pub error: TradingError,
}

/// Merged result of a fan-out across platforms
///
/// Items are appended in the order platforms complete; each platform's own
/// ordering is preserved. Nothing is deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct FanOut<T> {
    pub items: Vec<T>,
    pub failures: Vec<PlatformFailure>,
}

impl<T> Default for FanOut<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            failures: Vec::new(),
        }
    }
}

impl<T> FanOut<T> {
    /// Merge one platform's listing; its per-record rejections become failures
    pub fn merge(&mut self, platform: &str, listing: Listing<T>) {
        self.items.extend(listing.items);
        self.failures.extend(listing.rejected.into_iter().map(|error| PlatformFailure {
            platform: platform.to_string(),
            error,
        }));
    }

    pub fn record_failure(&mut self, platform: &str, error: TradingError) {
        self.failures.push(PlatformFailure {
            platform: platform.to_string(),
            error,
        });
    }

    /// Platforms that contributed at least one failure
    pub fn failed_platforms(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.failures.iter().map(|f| f.platform.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_preserves_order_and_records_rejections() {
        let mut merged = FanOut::default();
        merged.merge("a", Listing::new(vec![1, 2]));
        merged.merge(
            "b",
            Listing::from_results(vec![Ok(3), Err(TradingError::decode("bad record")), Ok(4)]),
        );

        assert_eq!(merged.items, vec![1, 2, 3, 4]);
        assert_eq!(merged.failures.len(), 1);
        assert_eq!(merged.failures[0].platform, "b");
        assert!(matches!(merged.failures[0].error, TradingError::Decode(_)));
    }

    #[test]
    fn test_no_deduplication() {
        let mut merged = FanOut::default();
        merged.merge("a", Listing::new(vec!["x"]));
        merged.merge("b", Listing::new(vec!["x"]));
        assert_eq!(merged.into_items(), vec!["x", "x"]);
    }

    #[test]
    fn test_failed_platforms() {
        let mut merged: FanOut<u8> = FanOut::default();
        merged.record_failure("b", TradingError::timeout("slow"));
        merged.record_failure("a", TradingError::upstream("500"));
        merged.record_failure("b", TradingError::decode("bad"));

        assert!(merged.is_empty());
        assert_eq!(merged.failed_platforms(), vec!["a", "b"]);
    }
}
