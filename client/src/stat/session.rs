use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, ErrorKind},
    path::{Path, PathBuf},
};

/// Bearer token obtained from sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
}
impl Session {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

/// The one piece of state kept between runs: the session token, stored as
/// JSON at a fixed path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}
impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when no session has been saved.
    pub fn load(&self) -> Result<Option<Session>> {
        let file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("open {}", self.path.display()));
            }
        };
        let session: Session = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parse {}", self.path.display()))?;
        if session.token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let file = File::create(&self.path)
            .with_context(|| format!("create {}", self.path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), session)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> SessionStore {
        let dir = std::env::temp_dir().join(format!("xp-session-{}-{name}", std::process::id()));
        SessionStore::new(dir.join("session.json"))
    }

    #[test]
    fn save_load_clear() {
        let store = temp_store("roundtrip");
        assert_eq!(store.load().unwrap(), None);

        store.save(&Session::new("abc.def.ghi")).unwrap();
        assert_eq!(store.load().unwrap(), Some(Session::new("abc.def.ghi")));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        // clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn blank_token_counts_as_logged_out() {
        let store = temp_store("blank");
        store.save(&Session::new("  ")).unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }
}
