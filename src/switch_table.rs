//! Switch-table side channel.
//!
//! The table a `bctr` indexes lives in guest data and cannot be recovered
//! from the instruction alone, so it arrives as a small external document
//! keyed by branch-site address.

use hashbrown::HashMap;
use serde::Deserialize;

/// One computed-jump lowering: the branch site, the register holding the
/// case value, and the ordered list of intra-function targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SwitchTable {
    /// Guest address of the `bctr` this table applies to.
    pub base: u32,
    /// Index of the GPR holding the case value at the branch site.
    pub r: u8,
    /// Target addresses, indexed by case value.
    pub labels: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct SwitchTableDocument {
    #[serde(rename = "switch")]
    switch: Vec<SwitchTable>,
}

/// A read-only-after-load map from branch-site address to [`SwitchTable`].
#[derive(Debug, Default)]
pub struct SwitchTableStore {
    by_base: HashMap<u32, SwitchTable>,
}

impl SwitchTableStore {
    /// An empty store, for images with no switch-table side channel.
    pub fn empty() -> Self {
        SwitchTableStore::default()
    }

    /// Parse the top-level `switch = [...]` TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        let doc: SwitchTableDocument = toml::from_str(s)?;
        let by_base = doc.switch.into_iter().map(|t| (t.base, t)).collect();
        Ok(SwitchTableStore { by_base })
    }

    /// Look up the table for a branch site, if any.
    pub fn get(&self, base: u32) -> Option<&SwitchTable> {
        self.by_base.get(&base)
    }

    /// All tables whose branch site falls within `[range_base, range_end)`,
    /// used by label discovery (pass 1) to seed intra-function labels from
    /// every table that applies anywhere in the function, not just the one
    /// that ends up armed at translation time.
    pub fn tables_in_range(&self, range_base: u32, range_end: u32) -> impl Iterator<Item = &SwitchTable> {
        self.by_base
            .values()
            .filter(move |t| t.base >= range_base && t.base < range_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_document_and_indexes_by_base() {
        let doc = r#"
            [[switch]]
            base = 4096
            r = 3
            labels = [4096, 4112, 4128]
        "#;
        let store = SwitchTableStore::from_toml_str(doc).unwrap();
        let table = store.get(4096).unwrap();
        assert_eq!(table.r, 3);
        assert_eq!(table.labels, vec![4096, 4112, 4128]);
        assert!(store.get(1).is_none());
    }

    #[test]
    fn tables_in_range_filters_by_branch_site() {
        let doc = r#"
            [[switch]]
            base = 100
            r = 3
            labels = [200]

            [[switch]]
            base = 900
            r = 4
            labels = [901]
        "#;
        let store = SwitchTableStore::from_toml_str(doc).unwrap();
        let in_range: Vec<_> = store.tables_in_range(0, 500).collect();
        assert_eq!(in_range.len(), 1);
        assert_eq!(in_range[0].base, 100);
    }
}
