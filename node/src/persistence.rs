// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use avatar_kernel::snapshot::decode::decode_state;
use avatar_kernel::snapshot::encode::encode_state;
use avatar_kernel::state::registry::RegistryState;

use crate::errors::EngineError;

pub struct SnapshotManager;

impl SnapshotManager {
    /// Writes the snapshot through a temporary file and an atomic rename.
    /// The previous snapshot is kept next to it with a `.prev` suffix.
    pub fn save(path: &Path, state: &RegistryState) -> Result<Vec<u8>, std::io::Error> {
        let bytes = encode_state(state);
        let tmp_path = path.with_extension("tmp");

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }

        if path.exists() {
            // Ignore error if rename fails (e.g. permission)
            let _ = std::fs::rename(path, prev_path(path));
        }

        std::fs::rename(&tmp_path, path)?;
        Ok(bytes)
    }

    pub fn load(path: &Path) -> Result<RegistryState, EngineError> {
        let bytes = std::fs::read(path)?;
        Ok(decode_state(&bytes)?)
    }
}

fn prev_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".prev");
    PathBuf::from(name)
}
