//! Durable storage for [`SessionState`]
//!
//! The state file is replaced atomically: the new contents are written to a
//! temporary file in the same directory which is then renamed over the old
//! file, so an interrupted save leaves either the old or the new state and
//! never a torn file. Temporary files are only swept once they are old
//! enough that no live save can still own them.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing::{debug, warn};

use crate::config::env::EnvOverride;
use crate::config::state::SessionState;
use crate::constants::{auth, config};
use crate::errors::{ConfigError, ConfigResult};

/// Reads and writes the persisted session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store backed by an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$CF_HOME/.cf/config.json`, or the same under the home directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NoHomeDirectory` when neither location is known
    pub fn locate(env: &EnvOverride) -> ConfigResult<Self> {
        let base = match &env.cf_home {
            Some(home) => home.clone(),
            None => dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?,
        };
        Ok(Self::new(base.join(config::DIR_NAME).join(config::FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state, falling back to defaults when nothing was saved yet
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Read` when the file exists but cannot be read and
    /// `ConfigError::InvalidFormat` when it is not valid state JSON
    pub fn load(&self) -> ConfigResult<SessionState> {
        self.remove_stale_temp_files(config::STALE_TEMP_FILE_AGE);

        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config file at {}, using defaults", self.path.display());
                return Ok(SessionState::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            warn!(
                "Config file {} is empty, using defaults",
                self.path.display()
            );
            return Ok(SessionState::default());
        }

        let mut state: SessionState =
            serde_json::from_slice(&bytes).map_err(|source| ConfigError::InvalidFormat {
                path: self.path.clone(),
                source,
            })?;

        if state.client_id.is_empty() {
            state.client_id = auth::DEFAULT_CLIENT_ID.to_string();
        }
        Ok(state)
    }

    /// Persist the state atomically
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Write` if the directory, the temporary file or
    /// the final rename fails. The previous file is left untouched in that case.
    pub fn save(&self, state: &SessionState) -> ConfigResult<()> {
        let dir = self.dir();
        create_private_dir(dir).map_err(|source| ConfigError::Write {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut state = state.clone();
        state.config_version = config::CURRENT_VERSION;
        let json = serde_json::to_vec_pretty(&state)?;

        let write_err = |source: io::Error| ConfigError::Write {
            path: self.path.clone(),
            source,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(config::TEMP_FILE_PREFIX)
            .tempfile_in(dir)
            .map_err(write_err)?;
        temp.write_all(&json).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = fs::Permissions::from_mode(config::FILE_PERMISSIONS);
            temp.as_file()
                .set_permissions(permissions)
                .map_err(write_err)?;
        }

        temp.persist(&self.path).map_err(|e| write_err(e.error))?;
        debug!("Saved config to {}", self.path.display());
        Ok(())
    }

    fn dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Temp files survive only when a previous save was killed mid-write.
    /// Younger ones may belong to a save running in another process.
    fn remove_stale_temp_files(&self, max_age: Duration) {
        let Ok(entries) = fs::read_dir(self.dir()) else {
            return;
        };
        let now = SystemTime::now();
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(config::TEMP_FILE_PREFIX) {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            match age {
                Some(age) if age >= max_age => {
                    if let Err(e) = fs::remove_file(entry.path()) {
                        debug!("Could not remove stale {}: {}", entry.path().display(), e);
                    }
                }
                _ => debug!("Keeping recent {}", entry.path().display()),
            }
        }
    }
}

fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(config::DIR_PERMISSIONS);
    }
    builder.create(dir)
}
