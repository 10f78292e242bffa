use std::fs;
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::SessionRegistryError;
use crate::paths::{active_session_path, sessions_path};
use crate::reconcile::{merge_sessions, ServerSession};
use crate::schema::{default_display_name, ActiveSessionFile, SessionListFile, SessionRecord};

/// Local persisted registry of known sessions plus the last-active session id.
///
/// Both files are advisory caches, not the system of record. Every mutation
/// rewrites the affected file in full and only commits to memory once the
/// write succeeded, so a failed operation leaves the registry untouched.
#[derive(Debug)]
pub struct SessionRegistry {
    root: PathBuf,
    sessions: Vec<SessionRecord>,
    active_session_id: Option<String>,
}

impl SessionRegistry {
    /// Open (or initialize) the registry under `root`. Missing files yield an
    /// empty registry; corrupt files are a typed error.
    pub fn open(root: &Path) -> Result<Self, SessionRegistryError> {
        fs::create_dir_all(root)
            .map_err(|source| SessionRegistryError::io("creating registry directory", root, source))?;

        let sessions = match read_json::<SessionListFile>(&sessions_path(root))? {
            Some(file) => {
                validate_version(&sessions_path(root), file.version)?;
                file.sessions
            }
            None => Vec::new(),
        };

        let active_session_id = match read_json::<ActiveSessionFile>(&active_session_path(root))? {
            Some(file) => {
                validate_version(&active_session_path(root), file.version)?;
                let id = file.session_id;
                // A stale pointer to a deleted session is not an error.
                sessions
                    .iter()
                    .any(|record| record.id == id)
                    .then_some(id)
            }
            None => None,
        };

        Ok(Self {
            root: root.to_path_buf(),
            sessions,
            active_session_id,
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SessionRecord> {
        self.sessions.iter().find(|record| record.id == id)
    }

    #[must_use]
    pub fn active_session_id(&self) -> Option<&str> {
        self.active_session_id.as_deref()
    }

    /// Create a fresh session with a v4 id and a positional default label.
    pub fn create_session(&mut self) -> Result<SessionRecord, SessionRegistryError> {
        let record = SessionRecord {
            id: Uuid::new_v4().to_string(),
            display_name: Some(default_display_name(self.sessions.len() + 1)),
            created_at: now_rfc3339()?,
            updated_at: None,
            message_count: 0,
        };

        let mut sessions = self.sessions.clone();
        sessions.push(record.clone());
        self.commit_sessions(sessions)?;
        Ok(record)
    }

    /// Set or clear the user-chosen label. A blank name falls back to the
    /// positional default on the next reconciliation.
    pub fn rename_session(&mut self, id: &str, name: &str) -> Result<(), SessionRegistryError> {
        let index = self.index_of(id)?;
        let mut sessions = self.sessions.clone();
        let trimmed = name.trim();
        sessions[index].display_name = if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        };

        self.commit_sessions(sessions)
    }

    pub fn remove_session(&mut self, id: &str) -> Result<(), SessionRegistryError> {
        let index = self.index_of(id)?;
        let mut sessions = self.sessions.clone();
        sessions.remove(index);
        self.commit_sessions(sessions)?;

        if self.active_session_id.as_deref() == Some(id) {
            self.active_session_id = None;
            let path = active_session_path(&self.root);
            if path.exists() {
                fs::remove_file(&path).map_err(|source| {
                    SessionRegistryError::io("removing active-session file", path, source)
                })?;
            }
        }

        Ok(())
    }

    pub fn set_active_session(&mut self, id: &str) -> Result<(), SessionRegistryError> {
        self.index_of(id)?;
        write_json(
            &active_session_path(&self.root),
            &ActiveSessionFile::v1(id),
        )?;
        self.active_session_id = Some(id.to_string());
        Ok(())
    }

    /// Record a completed turn: bump `updated_at` and store the new count.
    pub fn record_turn(
        &mut self,
        id: &str,
        message_count: u32,
    ) -> Result<(), SessionRegistryError> {
        let index = self.index_of(id)?;
        let mut sessions = self.sessions.clone();
        sessions[index].updated_at = Some(now_rfc3339()?);
        sessions[index].message_count = message_count;
        self.commit_sessions(sessions)
    }

    /// Write back a recomputed message count without touching `updated_at`.
    pub fn set_message_count(
        &mut self,
        id: &str,
        message_count: u32,
    ) -> Result<(), SessionRegistryError> {
        let index = self.index_of(id)?;
        if self.sessions[index].message_count == message_count {
            return Ok(());
        }

        let mut sessions = self.sessions.clone();
        sessions[index].message_count = message_count;
        self.commit_sessions(sessions)
    }

    /// Merge the authoritative server list into the cache and persist the
    /// result. Callers must not invoke this when the list fetch failed; a
    /// failed fetch leaves the cache untouched.
    pub fn apply_server_sessions(
        &mut self,
        server: &[ServerSession],
    ) -> Result<(), SessionRegistryError> {
        let merged = merge_sessions(&self.sessions, server, OffsetDateTime::now_utc());
        self.commit_sessions(merged)
    }

    fn index_of(&self, id: &str) -> Result<usize, SessionRegistryError> {
        self.sessions
            .iter()
            .position(|record| record.id == id)
            .ok_or_else(|| SessionRegistryError::UnknownSession { id: id.to_string() })
    }

    fn commit_sessions(
        &mut self,
        sessions: Vec<SessionRecord>,
    ) -> Result<(), SessionRegistryError> {
        write_json(
            &sessions_path(&self.root),
            &SessionListFile::v1(sessions.clone()),
        )?;
        self.sessions = sessions;
        Ok(())
    }
}

fn validate_version(path: &Path, version: u32) -> Result<(), SessionRegistryError> {
    if version != 1 {
        return Err(SessionRegistryError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: version,
        });
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> Result<Option<T>, SessionRegistryError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SessionRegistryError::io("reading registry file", path, source))
        }
    };

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|source| SessionRegistryError::json_parse(path, source))
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), SessionRegistryError> {
    let contents = serde_json::to_string_pretty(value)
        .map_err(|source| SessionRegistryError::json_serialize(path, source))?;

    // Full rewrite via a sibling temp file so readers never observe a
    // partially written cache.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)
        .map_err(|source| SessionRegistryError::io("writing registry file", &tmp, source))?;
    fs::rename(&tmp, path)
        .map_err(|source| SessionRegistryError::io("replacing registry file", path, source))
}

fn now_rfc3339() -> Result<String, SessionRegistryError> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .map_err(SessionRegistryError::ClockFormat)
}
