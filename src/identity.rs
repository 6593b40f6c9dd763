use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::AppError;

/// Batch display-name lookup backed by the identity provider.
pub trait IdentityDirectory {
    /// Returns names for the ids the directory knows; unknown ids are omitted.
    fn display_names(&self, user_ids: &[String]) -> HashMap<String, String>;
}

/// Used when no identity provider is wired in.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDirectory;

impl IdentityDirectory for NoDirectory {
    fn display_names(&self, _user_ids: &[String]) -> HashMap<String, String> {
        HashMap::new()
    }
}

#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    names: HashMap<String, String>,
}

impl StaticDirectory {
    pub fn new(names: HashMap<String, String>) -> Self {
        Self { names }
    }

    /// Loads a JSON object mapping user ids to display names.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path)?;
        let names: HashMap<String, String> = serde_json::from_str(&raw)?;
        Ok(Self::new(names))
    }
}

impl IdentityDirectory for StaticDirectory {
    fn display_names(&self, user_ids: &[String]) -> HashMap<String, String> {
        user_ids
            .iter()
            .filter_map(|id| self.names.get(id).map(|name| (id.clone(), name.clone())))
            .collect()
    }
}
