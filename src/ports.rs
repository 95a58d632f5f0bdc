//! Static port catalog (external collaborator, §1/§6): a read-only lookup
//! table. The core only implements its read interface (`list`/`search`);
//! the catalog's maintenance pipeline is out of scope.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub country: String,
    /// UN/LOCODE.
    pub code: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct PortCatalogFile {
    ports: Vec<Port>,
}

/// A small embedded catalog used when no external file is supplied. The
/// full catalog is expected to be loaded from `DATA_DIR/ports.json` in
/// production; this fallback keeps `listPorts`/`searchPorts` usable in
/// tests and standalone CLI runs without requiring a dataset directory.
fn builtin_ports() -> Vec<Port> {
    const RAW: &str = include_str!("../data/ports_builtin.json");
    serde_json::from_str::<PortCatalogFile>(RAW).expect("builtin port catalog must parse").ports
}

pub struct PortCatalog {
    ports: Vec<Port>,
}

impl PortCatalog {
    pub fn builtin() -> Self {
        Self { ports: builtin_ports() }
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        let file: PortCatalogFile = serde_json::from_str(data)?;
        Ok(Self { ports: file.ports })
    }

    /// `listPorts(limit) → Port[]`.
    pub fn list(&self, limit: usize) -> Vec<Port> {
        self.ports.iter().take(limit).cloned().collect()
    }

    /// `searchPorts(query, limit)` — case-insensitive substring match on
    /// name/country/code.
    pub fn search(&self, query: &str, limit: usize) -> Vec<Port> {
        let needle = query.to_lowercase();
        self.ports
            .iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p.country.to_lowercase().contains(&needle)
                    || p.code.to_lowercase().contains(&needle)
            })
            .take(limit)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_respects_limit() {
        let catalog = PortCatalog::builtin();
        assert!(catalog.list(2).len() <= 2);
    }

    #[test]
    fn search_is_case_insensitive() {
        let catalog = PortCatalog::builtin();
        let lower = catalog.search("istanbul", 10);
        let upper = catalog.search("ISTANBUL", 10);
        assert_eq!(lower.len(), upper.len());
        assert!(!lower.is_empty());
    }

    #[test]
    fn search_matches_on_code_and_country() {
        let catalog = PortCatalog::builtin();
        assert!(!catalog.search("TR", 10).is_empty());
        assert!(!catalog.search("Turkey", 10).is_empty());
    }
}
