//! Common test utilities and helpers
//!
//! Shared fixtures for the integration tests: config files on disk and a
//! handler that records what it saw.

use std::collections::HashMap;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Write `contents` to a fresh `.toml` file that lives as long as the handle
pub fn toml_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes())
        .expect("write temp config");
    file
}

/// Items seen by a handler, with the worker thread that handled each
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<HashMap<u64, String>>>,
    duplicates: Arc<Mutex<Vec<u64>>>,
}

impl Recorder {
    pub fn record(&self, item: u64) {
        let thread_name = thread::current().name().unwrap_or("<unnamed>").to_string();
        let previous = self.seen.lock().unwrap().insert(item, thread_name);
        if previous.is_some() {
            self.duplicates.lock().unwrap().push(item);
        }
    }

    pub fn count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn duplicates(&self) -> Vec<u64> {
        self.duplicates.lock().unwrap().clone()
    }

    pub fn thread_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.seen.lock().unwrap().values().cloned().collect();
        names.sort();
        names.dedup();
        names
    }
}

pub fn eventually(condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    condition()
}
