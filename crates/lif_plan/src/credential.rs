//! Ephemeral credential generation for data stores.
//!
//! Credentials exist only in memory for the duration of one compile.
//! They are drawn from a cryptographically secure source and are never
//! logged or persisted.

use crate::graph::ResourceGraph;
use indexmap::IndexMap;
use lif_core::ResourceId;
use rand::rngs::OsRng;
use rand::{CryptoRng, Rng, RngCore};
use std::fmt;

/// Length of generated user names and passwords
pub const CREDENTIAL_LENGTH: usize = 16;

/// Symbols credentials are drawn from
pub const CREDENTIAL_ALPHABET: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Port the data store listens on inside its container
pub const DATA_STORE_PORT: u16 = 5432;

/// Generated credentials of one data store
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialSet {
    user: String,
    password: String,
    url: String,
}

impl CredentialSet {
    /// Properties a data store exposes through references
    pub const PROPERTIES: [&'static str; 3] = ["url", "user", "password"];

    /// Build a set for a data store; the id is both hostname and database name
    #[must_use]
    pub fn new(id: &ResourceId, user: String, password: String) -> Self {
        let url = format!("postgres://{user}:{password}@{id}:{DATA_STORE_PORT}/{id}");
        Self {
            user,
            password,
            url,
        }
    }

    /// User name
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Password
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Connection url
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Look up a property by name
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        match name {
            "url" => Some(&self.url),
            "user" => Some(&self.user),
            "password" => Some(&self.password),
            _ => None,
        }
    }
}

impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Credentials of every data store in one compile
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    sets: IndexMap<ResourceId, CredentialSet>,
}

impl CredentialStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the set of a data store
    pub fn insert(&mut self, id: ResourceId, set: CredentialSet) {
        self.sets.insert(id, set);
    }

    /// Get the set of a data store
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CredentialSet> {
        self.sets.get(id)
    }

    /// Iterate in generation order
    pub fn iter(&self) -> impl Iterator<Item = (&ResourceId, &CredentialSet)> {
        self.sets.iter()
    }

    /// Number of data stores with credentials
    #[must_use]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    /// Check if store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Credential generator over a cryptographically secure random source
pub struct CredentialGenerator<R = OsRng> {
    rng: R,
}

impl CredentialGenerator<OsRng> {
    /// Create a generator backed by the operating system
    #[must_use]
    pub fn new() -> Self {
        Self { rng: OsRng }
    }
}

impl Default for CredentialGenerator<OsRng> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: RngCore + CryptoRng> CredentialGenerator<R> {
    /// Create a generator over a given source
    #[must_use]
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    /// Draw one token uniformly over [`CREDENTIAL_ALPHABET`]
    pub fn token(&mut self) -> String {
        (0..CREDENTIAL_LENGTH)
            .map(|_| CREDENTIAL_ALPHABET[self.rng.gen_range(0..CREDENTIAL_ALPHABET.len())] as char)
            .collect()
    }

    /// Generate the set of one data store
    pub fn generate(&mut self, id: &ResourceId) -> CredentialSet {
        let user = self.token();
        let password = self.token();
        CredentialSet::new(id, user, password)
    }

    /// Generate a fresh set for every data store of the graph
    pub fn generate_all(&mut self, graph: &ResourceGraph) -> CredentialStore {
        let mut store = CredentialStore::new();
        for id in graph.data_stores() {
            let set = self.generate(id);
            tracing::debug!(resource = %id, "generated data store credentials");
            store.insert(id.clone(), set);
        }
        store
    }
}
