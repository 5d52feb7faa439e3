//! # Naming Module
//!
//! Gives every final cluster a name from a line-delimited name list.
//!
//! A short list is repeated until it covers every cluster, then the pool is
//! shuffled, so a run never fails for lack of names as long as the list has
//! at least one entry.

use crate::error::InputError;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::fs;
use std::path::{Path, PathBuf};

/// Names loaded from disk
#[derive(Debug, Clone)]
pub struct NameList {
    source: PathBuf,
    names: Vec<String>,
}

impl NameList {
    /// Read trimmed, non-empty lines from `path`
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let contents = fs::read_to_string(path).map_err(|e| InputError::NameListUnreadable {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(path, &contents)
    }

    /// Parse names from already-read text.
    ///
    /// Names become folder names, so path separators and the `.`/`..`
    /// entries are rejected.
    pub fn parse(source: &Path, contents: &str) -> Result<Self, InputError> {
        let names: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if let Some(bad) = names.iter().find(|name| !is_folder_safe(name)) {
            return Err(InputError::NameInvalid {
                path: source.to_path_buf(),
                name: bad.clone(),
            });
        }

        if names.is_empty() {
            return Err(InputError::NameListEmpty {
                path: source.to_path_buf(),
            });
        }

        Ok(Self {
            source: source.to_path_buf(),
            names,
        })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false: loading rejects empty lists
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Exactly `count` names, cycling the list when it is too short
    pub fn assign<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> Vec<String> {
        let mut pool = if self.names.len() < count {
            let repeats = count / self.names.len() + 1;
            let mut pool: Vec<String> = self
                .names
                .iter()
                .cycle()
                .take(self.names.len() * repeats)
                .cloned()
                .collect();
            pool.truncate(count);
            pool
        } else {
            self.names.clone()
        };

        pool.shuffle(rng);
        pool.truncate(count);
        pool
    }

    /// Assign with a seeded generator, or OS entropy when `seed` is None
    pub fn assign_seeded(&self, count: usize, seed: Option<u64>) -> Vec<String> {
        let mut rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        self.assign(count, &mut rng)
    }
}

fn is_folder_safe(name: &str) -> bool {
    name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
