//! Infrastructure implementation of the `CredentialStore` port.
//!
//! `JsonCredentialStore` keeps the token map in memory and rewrites the
//! whole JSON file on every mutation with an atomic write (temp file +
//! rename) so readers never observe a half-written store.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::CredentialStore;
use crate::domain::validate_token;

/// Token map persisted to `~/.botfleet/tokens.json`.
pub struct JsonCredentialStore {
    path: PathBuf,
    tokens: BTreeMap<String, String>,
}

impl JsonCredentialStore {
    /// Loads the store at `path`.
    ///
    /// A missing file is an empty store. An unreadable or corrupt file is
    /// logged and also treated as empty; it is replaced on the next write.
    #[must_use]
    pub fn open(path: PathBuf) -> Self {
        let tokens = load(&path);
        Self { path, tokens }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names that currently hold a token.
    pub fn agents(&self) -> impl Iterator<Item = &str> {
        self.tokens.keys().map(String::as_str)
    }

    fn save(&self, tokens: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(tokens).context("serializing tokens")?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("finalizing token file {}", self.path.display()))?;
        Ok(())
    }

    /// Persists `next` and only then makes it the live map.
    fn commit(&mut self, next: BTreeMap<String, String>) -> Result<()> {
        self.save(&next)?;
        self.tokens = next;
        Ok(())
    }
}

fn load(path: &Path) -> BTreeMap<String, String> {
    if !path.exists() {
        return BTreeMap::new();
    }
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "cannot read token file, starting empty");
            return BTreeMap::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(tokens) => tokens,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "corrupt token file, starting empty");
            BTreeMap::new()
        }
    }
}

impl CredentialStore for JsonCredentialStore {
    fn get(&self, agent: &str) -> String {
        self.tokens.get(agent).cloned().unwrap_or_default()
    }

    fn set(&mut self, agent: &str, token: &str) -> Result<()> {
        let token = validate_token(token)?;
        let mut next = self.tokens.clone();
        next.insert(agent.to_string(), token);
        self.commit(next)
    }

    fn clear(&mut self, agent: &str) -> Result<()> {
        if !self.tokens.contains_key(agent) {
            return Ok(());
        }
        let mut next = self.tokens.clone();
        next.remove(agent);
        self.commit(next)
    }
}
