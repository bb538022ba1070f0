//! Named snapshots of a workspace.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DsgenError;
use crate::state::PersistedState;
use crate::storage::{KeyValueStore, PROFILES_KEY};

/// `{ name, updatedAt, state }`, both in the profile table and as an export file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub updated_at: DateTime<Utc>,
    pub state: PersistedState,
}

impl Profile {
    pub fn new(name: impl Into<String>, state: PersistedState) -> Self {
        Self {
            name: name.into(),
            updated_at: Utc::now(),
            state,
        }
    }
}

/// Profile table keyed by name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(data: &str) -> Result<Self, DsgenError> {
        let profiles = serde_json::from_str(data)?;
        Ok(Self { profiles })
    }

    pub fn to_json(&self) -> Result<String, DsgenError> {
        Ok(serde_json::to_string(&self.profiles)?)
    }

    /// Read the table from `store`; a missing entry yields an empty table.
    pub fn open<S: KeyValueStore + ?Sized>(store: &S) -> Result<Self, DsgenError> {
        match store.get(PROFILES_KEY)? {
            Some(raw) => Self::from_json(&raw),
            None => Ok(Self::new()),
        }
    }

    pub fn persist<S: KeyValueStore + ?Sized>(&self, store: &mut S) -> Result<(), DsgenError> {
        store.set(PROFILES_KEY, &self.to_json()?)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Store a new profile; an existing name is rejected.
    pub fn save(&mut self, name: &str, state: PersistedState) -> Result<&Profile, DsgenError> {
        let name = profile_name(name)?;
        if self.profiles.contains_key(name) {
            return Err(DsgenError::DuplicateProfile {
                name: name.to_string(),
            });
        }
        Ok(self.put(Profile::new(name, state)))
    }

    /// Store a profile, replacing any existing one of the same name.
    pub fn overwrite(&mut self, name: &str, state: PersistedState) -> Result<&Profile, DsgenError> {
        let name = profile_name(name)?;
        Ok(self.put(Profile::new(name, state)))
    }

    pub fn load(&self, name: &str) -> Result<&PersistedState, DsgenError> {
        let profile = self.profiles.get(name).ok_or_else(|| DsgenError::ProfileNotFound {
            name: name.to_string(),
        })?;
        #[cfg(feature = "tracing")]
        tracing::info!(profile = %profile.name, "profile loaded");
        Ok(&profile.state)
    }

    pub fn delete(&mut self, name: &str) -> Result<Profile, DsgenError> {
        self.profiles
            .remove(name)
            .ok_or_else(|| DsgenError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Most recently updated first; ties break on name.
    pub fn list(&self) -> Vec<&Profile> {
        let mut all: Vec<&Profile> = self.profiles.values().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.name.cmp(&b.name)));
        all
    }

    /// Pretty JSON export document for one profile.
    pub fn export_document(&self, name: &str) -> Result<Vec<u8>, DsgenError> {
        let profile = self.profiles.get(name).ok_or_else(|| DsgenError::ProfileNotFound {
            name: name.to_string(),
        })?;
        Ok(serde_json::to_vec_pretty(profile)?)
    }

    /// Parse an export document. `updatedAt` is optional and defaults to now.
    pub fn import_document(data: &[u8]) -> Result<Profile, DsgenError> {
        let invalid = |reason: String| DsgenError::InvalidProfileFormat { reason };
        let doc: Value =
            serde_json::from_slice(data).map_err(|e| invalid(format!("not JSON: {e}")))?;
        let Value::Object(mut doc) = doc else {
            return Err(invalid("document is not an object".into()));
        };
        let name = match doc.remove("name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => return Err(invalid("missing `name`".into())),
        };
        let state = match doc.remove("state") {
            Some(state @ Value::Object(_)) => serde_json::from_value::<PersistedState>(state)
                .map_err(|e| invalid(format!("bad `state`: {e}")))?,
            _ => return Err(invalid("missing `state`".into())),
        };
        let updated_at = doc
            .remove("updatedAt")
            .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok())
            .unwrap_or_else(Utc::now);
        Ok(Profile {
            name,
            updated_at,
            state,
        })
    }

    /// Add an imported profile. Existing names are replaced only when `replace` is set.
    pub fn insert(&mut self, profile: Profile, replace: bool) -> Result<&Profile, DsgenError> {
        if !replace && self.profiles.contains_key(&profile.name) {
            return Err(DsgenError::DuplicateProfile { name: profile.name });
        }
        Ok(self.put(profile))
    }

    fn put(&mut self, profile: Profile) -> &Profile {
        #[cfg(feature = "tracing")]
        tracing::info!(profile = %profile.name, "profile stored");
        let name = profile.name.clone();
        self.profiles.insert(name.clone(), profile);
        &self.profiles[&name]
    }
}

fn profile_name(name: &str) -> Result<&str, DsgenError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DsgenError::InvalidProfileFormat {
            reason: "profile name must not be empty".into(),
        });
    }
    Ok(name)
}
