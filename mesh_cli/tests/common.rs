//! Shared helper for the integration suite: writes cluster config text to
//! a real file so `load_cluster` can be exercised the way `main.rs` calls
//! it, without wiring a fixture directory into the crate.
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

static COUNTER: AtomicU64 = AtomicU64::new(0);

pub struct TempConfig {
    pub path: PathBuf,
}

impl TempConfig {
    pub fn write(contents: &str) -> Self {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!("meshctl-it-{}-{}.mesh", std::process::id(), n));
        fs::write(&path, contents).unwrap();
        TempConfig { path }
    }
}

impl Drop for TempConfig {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
