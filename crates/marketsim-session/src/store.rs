//! ---
//! msim_section: "02-session-persistence"
//! msim_subsection: "module"
//! msim_type: "source"
//! msim_scope: "code"
//! msim_description: "JSON-per-user session store rooted at a directory."
//! msim_version: "v0.1.0"
//! msim_owner: "tbd"
//! ---
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use marketsim_common::config::StoreConfig;
use tracing::debug;

use crate::record::UserSession;
use crate::{Result, SessionError};

/// Filesystem store holding one JSON record per user name.
///
/// `save` always replaces the whole record; callers own the
/// read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Open the store configured for this run.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Self::new(&config.directory)
    }

    /// Directory the records live in.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.json"))
    }

    /// Whether a record is stored under `name`.
    pub fn exists(&self, name: &str) -> bool {
        self.record_path(name).is_file()
    }

    /// Load the full record stored under `name`.
    pub fn load(&self, name: &str) -> Result<UserSession> {
        let path = self.record_path(name);
        let raw = fs::read_to_string(&path).map_err(|err| {
            if err.kind() == std::io::ErrorKind::NotFound {
                SessionError::NotFound {
                    name: name.to_owned(),
                }
            } else {
                SessionError::Io(err)
            }
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Persist the full record under `name`, replacing any prior content.
    pub fn save(&self, name: &str, session: &UserSession) -> Result<()> {
        let path = self.record_path(name);
        let mut stamped = session.clone();
        stamped.updated_at = Utc::now();
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &stamped)?;
        writer.flush()?;
        debug!(user = %name, path = %path.display(), "session persisted");
        Ok(())
    }
}
