//! In-memory mock filesystem for testing the counter reader without a real
//! `/proc` and `/sys`.
//!
//! Interior mutability lets a test bump counters on a `MockFs` that has
//! already been cloned into a reader, the same way the kernel updates
//! `/proc/net/dev` underneath a running collector.

use crate::collector::traits::FileSystem;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory filesystem for testing.
///
/// Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

/// One entry of a mocked `/proc/net/dev` table.
#[derive(Debug, Clone, PartialEq)]
pub struct MockInterface {
    pub name: String,
    pub rx_bytes: u64,
}

impl MockFs {
    /// Creates a new empty mock filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    fn files(&self) -> MutexGuard<'_, HashMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Adds (or replaces) a file with the given content.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        self.files()
            .insert(path.as_ref().to_path_buf(), content.into());
    }

    /// Adds `/sys/class/net/<name>/{operstate,carrier}` for one interface.
    pub fn add_link(&self, name: &str, operstate: &str, carrier: Option<&str>) {
        let base = PathBuf::from(format!("/sys/class/net/{}", name));
        self.add_file(base.join("operstate"), format!("{}\n", operstate));
        if let Some(carrier) = carrier {
            self.add_file(base.join("carrier"), format!("{}\n", carrier));
        }
    }

    /// Rewrites `/proc/net/dev` from a list of interfaces.
    pub fn set_net_dev(&self, interfaces: &[MockInterface]) {
        let mut content = String::from(
            "Inter-|   Receive                                                |  Transmit\n \
             face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed\n",
        );
        for iface in interfaces {
            content.push_str(&format!(
                "{:>6}: {} 100 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n",
                iface.name, iface.rx_bytes
            ));
        }
        self.add_file("/proc/net/dev", content);
    }
}

impl MockInterface {
    pub fn new(name: &str, rx_bytes: u64) -> Self {
        Self {
            name: name.to_string(),
            rx_bytes,
        }
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files().get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }
}
