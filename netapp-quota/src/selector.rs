//! Volume selection by name prefix

use tracing::debug;

use crate::client::{StorageClient, Volume};
use crate::error::{FailureCause, QuotaError, Result};

/// Selects the in-scope volumes from the controller inventory
#[derive(Debug, Clone, Default)]
pub struct VolumeSelector {
    prefix: String,
}

impl VolumeSelector {
    /// Create a selector; an empty prefix selects every volume
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Keep the volumes whose name starts with the prefix, in inventory order
    pub fn select(&self, volumes: Vec<Volume>) -> Vec<Volume> {
        if self.prefix.is_empty() {
            return volumes;
        }

        volumes
            .into_iter()
            .filter(|v| v.name.starts_with(&self.prefix))
            .collect()
    }

    /// Fetch the inventory and select from it
    ///
    /// Inventory failures are returned as [`QuotaError::Inventory`] without
    /// retrying.
    pub async fn discover(&self, client: &dyn StorageClient) -> Result<Vec<Volume>> {
        let volumes = client
            .list_volumes()
            .await
            .map_err(|e| QuotaError::Inventory(FailureCause::Transport(e)))?
            .into_passed()
            .map_err(QuotaError::Inventory)?;

        let total = volumes.len();
        let selected = self.select(volumes);
        debug!(
            "Selected {} of {} volumes (prefix '{}')",
            selected.len(),
            total,
            self.prefix
        );

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockStorageClient;
    use proptest::prelude::*;

    fn volumes(names: &[&str]) -> Vec<Volume> {
        names.iter().map(|n| Volume::new(*n)).collect()
    }

    fn names(volumes: &[Volume]) -> Vec<&str> {
        volumes.iter().map(|v| v.name.as_str()).collect()
    }

    #[test]
    fn test_select_by_prefix() {
        let selector = VolumeSelector::new("vol_");
        let selected = selector.select(volumes(&["vol_a", "vol_b", "xyz"]));
        assert_eq!(names(&selected), vec!["vol_a", "vol_b"]);
    }

    #[test]
    fn test_empty_prefix_keeps_everything() {
        let selector = VolumeSelector::new("");
        let selected = selector.select(volumes(&["zeta", "alpha", "vol_a"]));
        assert_eq!(names(&selected), vec!["zeta", "alpha", "vol_a"]);
    }

    #[test]
    fn test_prefix_is_literal() {
        let inventory = volumes(&["vol.a", "volXa", "vol*", "VOL_a", "vol_"]);

        assert_eq!(names(&VolumeSelector::new("vol.").select(inventory.clone())), vec!["vol.a"]);
        assert_eq!(names(&VolumeSelector::new("vol*").select(inventory.clone())), vec!["vol*"]);
        assert_eq!(names(&VolumeSelector::new("vol_").select(inventory)), vec!["vol_"]);
    }

    #[test]
    fn test_select_matches_starts_with_for_many_prefixes() {
        let inventory = volumes(&["a", "ab", "abc", "b", "ba", "", "äb", "ab"]);

        for prefix in ["", "a", "ab", "abc", "abcd", "b", "ä", "z"] {
            let selected = VolumeSelector::new(prefix).select(inventory.clone());
            let expected: Vec<Volume> = inventory
                .iter()
                .filter(|v| v.name.starts_with(prefix))
                .cloned()
                .collect();
            assert_eq!(selected, expected, "prefix '{}'", prefix);
        }
    }

    // Small alphabet so generated prefixes often match
    fn arb_name() -> impl Strategy<Value = String> {
        "[ab_.ä]{0,6}"
    }

    proptest! {
        #[test]
        fn proptest_select_is_an_ordered_starts_with_filter(
            prefix in "[ab_.ä]{0,3}",
            inventory in prop::collection::vec(arb_name(), 0..12),
        ) {
            let inventory: Vec<Volume> = inventory.into_iter().map(Volume::new).collect();
            let selected = VolumeSelector::new(prefix.as_str()).select(inventory.clone());
            let expected: Vec<Volume> = inventory
                .into_iter()
                .filter(|v| v.name.starts_with(prefix.as_str()))
                .collect();
            prop_assert_eq!(selected, expected);
        }

        #[test]
        fn proptest_empty_prefix_is_identity(
            inventory in prop::collection::vec(arb_name(), 0..12),
        ) {
            let inventory: Vec<Volume> = inventory.into_iter().map(Volume::new).collect();
            prop_assert_eq!(VolumeSelector::new("").select(inventory.clone()), inventory);
        }
    }

    #[tokio::test]
    async fn test_discover_filters_inventory() {
        let client = MockStorageClient::new()
            .with_volume("vol_a", "on", true)
            .with_volume("xyz", "on", true)
            .with_volume("vol_b", "off", false);

        let selected = VolumeSelector::new("vol_").discover(&client).await.unwrap();
        assert_eq!(names(&selected), vec!["vol_a", "vol_b"]);
    }

    #[tokio::test]
    async fn test_discover_reports_inventory_failure() {
        let client = MockStorageClient::new().with_volume("vol_a", "on", true);
        client.reject_inventory("cluster unreachable").await;

        let err = VolumeSelector::new("vol_").discover(&client).await.unwrap_err();
        assert!(matches!(err, QuotaError::Inventory(_)));
        assert_eq!(err.reason(), Some("cluster unreachable"));
    }
}
