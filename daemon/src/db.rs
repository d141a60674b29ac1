use crate::store::{Snapshot, Store};
use buildfarm_common::errors::*;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Scheduling state shared by the scan loop and the admin api. Never hold the
/// lock across a network call.
pub type Pool = Arc<Mutex<Store>>;

pub fn lock(pool: &Pool) -> Result<MutexGuard<'_, Store>> {
    pool.lock()
        .map_err(|_| anyhow!("Scheduling state is poisoned"))
}

pub fn setup_pool(state_path: Option<&Path>) -> Result<Pool> {
    let store = if let Some(path) = state_path {
        load_snapshot(path)?.unwrap_or_default()
    } else {
        debug!("No state path configured, starting with an empty store");
        Store::new()
    };
    Ok(Arc::new(Mutex::new(store)))
}

/// Returns `None` if there's no snapshot yet.
pub fn load_snapshot(path: &Path) -> Result<Option<Store>> {
    let buf = match fs::read(path) {
        Ok(buf) => buf,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            info!("No scheduling state found at {:?}, starting fresh", path);
            return Ok(None);
        }
        Err(err) => {
            return Err(err).with_context(|| anyhow!("Failed to read state file: {:?}", path))
        }
    };

    let snapshot = serde_json::from_slice::<Snapshot>(&buf)
        .with_context(|| anyhow!("Failed to parse state file: {:?}", path))?;
    let store = Store::restore(snapshot)?;
    info!(
        "Loaded {} builds, {} queue entries and {} builders from {:?}",
        store.builds().count(),
        store.queue_entries().count(),
        store.builders().count(),
        path
    );
    Ok(Some(store))
}

/// Writes to a temporary file next to `path` first so a crash never leaves a
/// truncated snapshot behind.
pub fn save_snapshot(path: &Path, store: &Store) -> Result<()> {
    let buf = serde_json::to_vec(&store.snapshot()).context("Failed to serialize state")?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| anyhow!("Failed to create directory: {:?}", parent))?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    fs::write(&tmp, buf).with_context(|| anyhow!("Failed to write state file: {:?}", tmp))?;
    fs::rename(&tmp, path).with_context(|| anyhow!("Failed to replace state file: {:?}", path))?;
    trace!("Saved scheduling state to {:?}", path);
    Ok(())
}
