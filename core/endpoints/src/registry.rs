//! Persistent registry of RPC endpoints.
//!
//! Endpoints live in a single pretty-printed JSON file next to the rest
//! of the data directory. The registry keeps the authoritative list in
//! memory and writes through on every mutation; a failed write rolls
//! the in-memory list back so the two never diverge.

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use ethervault_common::{Error, Result};

/// A named EVM RPC endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Stable ID derived from the name at creation.
    pub id: String,
    pub name: String,
    pub url: String,
    /// Native token symbol, e.g. "ETH" or "AVAX".
    pub symbol: String,
}

/// File-backed endpoint registry.
pub struct EndpointRegistry {
    endpoints: RwLock<Vec<Endpoint>>,
    path: PathBuf,
}

impl EndpointRegistry {
    /// Load the registry from a JSON file.
    ///
    /// A missing file starts an empty registry; a present but malformed
    /// file is an error rather than silent data loss.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let endpoints = match std::fs::read(&path) {
            Ok(data) => serde_json::from_slice(&data).map_err(|e| {
                Error::Serialization(format!("Malformed endpoint file: {}", e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), "Endpoint registry loaded");
        Ok(Self {
            endpoints: RwLock::new(endpoints),
            path,
        })
    }

    /// Add an endpoint, deriving its ID from the name.
    ///
    /// IDs are slugs of the name; collisions get a `-2`, `-3`, ...
    /// suffix so every endpoint keeps a distinct stable ID.
    ///
    /// # Errors
    /// - `Validation` if any field is empty after trimming or the URL is
    ///   not a valid http(s) URL
    /// - `Storage` if the file write fails; the list is unchanged
    pub fn add(&self, name: &str, url: &str, symbol: &str) -> Result<Endpoint> {
        let (name, url, symbol) = validate_fields(name, url, symbol)?;

        let mut endpoints = self.endpoints.write().unwrap();

        let base = slugify(&name);
        let mut id = base.clone();
        let mut n = 2;
        while endpoints.iter().any(|ep| ep.id == id) {
            id = format!("{}-{}", base, n);
            n += 1;
        }

        let endpoint = Endpoint {
            id,
            name,
            url,
            symbol,
        };
        endpoints.push(endpoint.clone());
        if let Err(e) = save(&self.path, &endpoints) {
            endpoints.pop();
            return Err(e);
        }

        info!(id = %endpoint.id, "Endpoint added");
        Ok(endpoint)
    }

    /// Replace an endpoint's fields, keeping its ID.
    ///
    /// # Errors
    /// - `Validation` on the same field rules as [`EndpointRegistry::add`]
    /// - `NotFound` if no endpoint has the given ID
    /// - `Storage` if the file write fails; the list is unchanged
    pub fn update(&self, id: &str, name: &str, url: &str, symbol: &str) -> Result<Endpoint> {
        let (name, url, symbol) = validate_fields(name, url, symbol)?;

        let mut endpoints = self.endpoints.write().unwrap();
        let index = endpoints
            .iter()
            .position(|ep| ep.id == id)
            .ok_or_else(|| Error::NotFound(format!("Endpoint '{}' not found", id)))?;

        let updated = Endpoint {
            id: id.to_string(),
            name,
            url,
            symbol,
        };
        let previous = std::mem::replace(&mut endpoints[index], updated.clone());
        if let Err(e) = save(&self.path, &endpoints) {
            endpoints[index] = previous;
            return Err(e);
        }

        info!(id = %id, "Endpoint updated");
        Ok(updated)
    }

    /// Remove an endpoint by ID.
    ///
    /// # Errors
    /// - `NotFound` if no endpoint has the given ID
    /// - `Storage` if the file write fails; the list is unchanged
    pub fn remove(&self, id: &str) -> Result<()> {
        let mut endpoints = self.endpoints.write().unwrap();
        let index = endpoints
            .iter()
            .position(|ep| ep.id == id)
            .ok_or_else(|| Error::NotFound(format!("Endpoint '{}' not found", id)))?;

        let removed = endpoints.remove(index);
        if let Err(e) = save(&self.path, &endpoints) {
            endpoints.insert(index, removed);
            return Err(e);
        }

        info!(id = %id, "Endpoint removed");
        Ok(())
    }

    /// Snapshot of all endpoints, in insertion order.
    pub fn list(&self) -> Vec<Endpoint> {
        self.endpoints.read().unwrap().clone()
    }

    /// Look up one endpoint by ID.
    pub fn get(&self, id: &str) -> Option<Endpoint> {
        self.endpoints
            .read()
            .unwrap()
            .iter()
            .find(|ep| ep.id == id)
            .cloned()
    }
}

fn validate_fields(name: &str, url: &str, symbol: &str) -> Result<(String, String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("Endpoint name is required".to_string()));
    }

    let url = url.trim();
    if url.is_empty() {
        return Err(Error::Validation("Endpoint URL is required".to_string()));
    }
    let parsed = Url::parse(url).map_err(|e| Error::Validation(format!("Invalid URL: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Validation(
            "Endpoint URL must use http or https".to_string(),
        ));
    }

    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(Error::Validation("Token symbol is required".to_string()));
    }

    Ok((name.to_string(), url.to_string(), symbol.to_string()))
}

/// Turn a display name into a URL-safe ID.
fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    for c in lowered.chars() {
        match c {
            ' ' => slug.push('-'),
            'a'..='z' | '0'..='9' | '-' => slug.push(c),
            _ => {}
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "endpoint".to_string()
    } else {
        slug.to_string()
    }
}

fn save(path: &Path, endpoints: &[Endpoint]) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(endpoints)
        .map_err(|e| Error::Serialization(format!("Failed to encode endpoints: {}", e)))?;
    data.push(b'\n');
    std::fs::write(path, data)
        .map_err(|e| Error::Storage(format!("Failed to write endpoint file: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_in(dir: &tempfile::TempDir) -> EndpointRegistry {
        EndpointRegistry::load(dir.path().join("endpoints.json")).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Avalanche C-Chain"), "avalanche-c-chain");
        assert_eq!(slugify("  Ether Mainnet!  "), "ether-mainnet");
        assert_eq!(slugify("--x--"), "x");
        assert_eq!(slugify("!!!"), "endpoint");
    }

    #[test]
    fn test_add_assigns_slug_ids_with_dedupe() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        let first = registry
            .add("Mainnet", "https://eth.example.com", "ETH")
            .unwrap();
        let second = registry
            .add("Mainnet", "https://eth-backup.example.com", "ETH")
            .unwrap();

        assert_eq!(first.id, "mainnet");
        assert_eq!(second.id, "mainnet-2");
        assert_eq!(registry.list().len(), 2);
    }

    #[test]
    fn test_add_validates_fields() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        assert!(matches!(
            registry.add("", "https://x.example.com", "ETH"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registry.add("X", "not a url", "ETH"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registry.add("X", "ftp://x.example.com", "ETH"),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            registry.add("X", "https://x.example.com", "  "),
            Err(Error::Validation(_))
        ));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_update_keeps_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);
        registry
            .add("Fuji", "https://fuji.example.com", "AVAX")
            .unwrap();

        let updated = registry
            .update("fuji", "Fuji Testnet", "https://fuji2.example.com", "AVAX")
            .unwrap();

        assert_eq!(updated.id, "fuji");
        assert_eq!(registry.get("fuji").unwrap().name, "Fuji Testnet");
    }

    #[test]
    fn test_update_and_remove_missing_id() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);

        assert!(matches!(
            registry.update("ghost", "X", "https://x.example.com", "ETH"),
            Err(Error::NotFound(_))
        ));
        assert!(matches!(registry.remove("ghost"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_failed_save_rolls_back_memory() {
        let dir = tempfile::tempdir().unwrap();
        // The parent directory never exists, so every save fails.
        let path = dir.path().join("missing").join("endpoints.json");
        let registry = EndpointRegistry::load(path).unwrap();

        let err = registry
            .add("Mainnet", "https://eth.example.com", "ETH")
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_remove_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let registry = registry_in(&dir);
        registry
            .add("Local", "http://localhost:8545", "ETH")
            .unwrap();

        registry.remove("local").unwrap();
        assert!(registry.get("local").is_none());
    }

    #[test]
    fn test_registry_persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("endpoints.json");

        {
            let registry = EndpointRegistry::load(&path).unwrap();
            registry
                .add("Mainnet", "https://eth.example.com", "ETH")
                .unwrap();
            registry
                .add("Fuji", "https://fuji.example.com", "AVAX")
                .unwrap();
        }

        let reloaded = EndpointRegistry::load(&path).unwrap();
        let ids: Vec<String> = reloaded.list().into_iter().map(|ep| ep.id).collect();
        assert_eq!(ids, vec!["mainnet", "fuji"]);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("endpoints.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            EndpointRegistry::load(&path),
            Err(Error::Serialization(_))
        ));
    }
}
