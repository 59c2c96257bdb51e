//! The Work Set: a persistent, order-preserving mapping from hostname to
//! its most recent serialized answer. Backed by a small in-process store
//! trait so a memory-resident variant and a disk-spilling variant can
//! share one API.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Backing storage for the Work Set. Implementors need not be `Send` on
/// their own; the [`WorkSet`] that wraps one is shared behind a lock.
pub trait WorkSetStore {
    fn put_if_absent(&mut self, host: &str) -> bool;
    fn get(&self, host: &str) -> Option<Vec<u8>>;
    fn set(&mut self, host: &str, answer: Vec<u8>) -> Result<()>;
    /// Deterministic, insertion-ordered scan. Must visit every entry
    /// exactly once.
    fn scan(&self) -> Vec<(String, Option<Vec<u8>>)>;
    fn len(&self) -> usize;
}

/// Fully in-memory store: an insertion-ordered index plus a parallel
/// answer slot per host. Adequate whenever the work set fits in memory.
#[derive(Default)]
pub struct MemoryStore {
    order: Vec<String>,
    index: HashMap<String, usize>,
    answers: Vec<Option<Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkSetStore for MemoryStore {
    fn put_if_absent(&mut self, host: &str) -> bool {
        if self.index.contains_key(host) {
            return false;
        }
        self.index.insert(host.to_string(), self.order.len());
        self.order.push(host.to_string());
        self.answers.push(None);
        true
    }

    fn get(&self, host: &str) -> Option<Vec<u8>> {
        let idx = *self.index.get(host)?;
        self.answers[idx].clone()
    }

    fn set(&mut self, host: &str, answer: Vec<u8>) -> Result<()> {
        let idx = *self
            .index
            .get(host)
            .ok_or_else(|| crate::error::RunnerError::config_error(format!("unknown host {host}")))?;
        self.answers[idx] = Some(answer);
        Ok(())
    }

    fn scan(&self) -> Vec<(String, Option<Vec<u8>>)> {
        self.order
            .iter()
            .cloned()
            .zip(self.answers.iter().cloned())
            .collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Spills serialized answers to an append-only file, keeping only the
/// insertion order and a `host -> (offset, len)` index in memory. Each
/// `set` appends a fresh record; the previous bytes for that host become
/// unreachable garbage, which is an acceptable trade for a single-pass
/// enumeration run.
pub struct FileStore {
    order: Vec<String>,
    index: HashMap<String, (u64, u32)>,
    file: File,
    path: PathBuf,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self {
            order: Vec::new(),
            index: HashMap::new(),
            file,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WorkSetStore for FileStore {
    fn put_if_absent(&mut self, host: &str) -> bool {
        if self.index.contains_key(host) {
            return false;
        }
        self.order.push(host.to_string());
        true
    }

    fn get(&self, host: &str) -> Option<Vec<u8>> {
        let (offset, len) = *self.index.get(host)?;
        let mut file = self.file.try_clone().ok()?;
        file.seek(SeekFrom::Start(offset)).ok()?;
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf).ok()?;
        Some(buf)
    }

    fn set(&mut self, host: &str, answer: Vec<u8>) -> Result<()> {
        let offset = self.file.seek(SeekFrom::End(0))?;
        self.file.write_all(&answer)?;
        self.index.insert(host.to_string(), (offset, answer.len() as u32));
        Ok(())
    }

    fn scan(&self) -> Vec<(String, Option<Vec<u8>>)> {
        self.order
            .iter()
            .cloned()
            .map(|host| {
                let answer = self.get(&host);
                (host, answer)
            })
            .collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// The Work Set, generic over its backing store.
pub struct WorkSet {
    store: Box<dyn WorkSetStore + Send>,
}

impl WorkSet {
    pub fn in_memory() -> Self {
        Self {
            store: Box::new(MemoryStore::new()),
        }
    }

    pub fn on_disk(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            store: Box::new(FileStore::open(path)?),
        })
    }

    /// Insert `host` if absent. Returns `true` if it was newly inserted.
    pub fn put_if_absent(&mut self, host: &str) -> bool {
        self.store.put_if_absent(host)
    }

    pub fn get(&self, host: &str) -> Option<Vec<u8>> {
        self.store.get(host)
    }

    pub fn set(&mut self, host: &str, answer: Vec<u8>) -> Result<()> {
        self.store.set(host, answer)
    }

    pub fn scan(&self) -> Vec<(String, Option<Vec<u8>>)> {
        self.store.scan()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_if_absent_is_idempotent() {
        let mut ws = WorkSet::in_memory();
        assert!(ws.put_if_absent("a.example.com"));
        assert!(!ws.put_if_absent("a.example.com"));
        assert_eq!(ws.len(), 1);
    }

    #[test]
    fn scan_is_insertion_ordered() {
        let mut ws = WorkSet::in_memory();
        for h in ["c.example.com", "a.example.com", "b.example.com"] {
            ws.put_if_absent(h);
        }
        let hosts: Vec<_> = ws.scan().into_iter().map(|(h, _)| h).collect();
        assert_eq!(hosts, vec!["c.example.com", "a.example.com", "b.example.com"]);
    }

    #[test]
    fn set_then_get_roundtrips() {
        let mut ws = WorkSet::in_memory();
        ws.put_if_absent("a.example.com");
        ws.set("a.example.com", b"payload".to_vec()).unwrap();
        assert_eq!(ws.get("a.example.com"), Some(b"payload".to_vec()));
    }

    #[test]
    fn file_store_roundtrips_through_disk() {
        let dir = std::env::temp_dir().join(format!("dnsweep-workset-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("workset.bin");
        let mut ws = WorkSet::on_disk(&path).unwrap();
        ws.put_if_absent("a.example.com");
        ws.put_if_absent("b.example.com");
        ws.set("a.example.com", b"alpha".to_vec()).unwrap();
        ws.set("b.example.com", b"beta".to_vec()).unwrap();
        assert_eq!(ws.get("a.example.com"), Some(b"alpha".to_vec()));
        assert_eq!(ws.get("b.example.com"), Some(b"beta".to_vec()));
        let scanned = ws.scan();
        assert_eq!(scanned.len(), 2);
        std::fs::remove_dir_all(&dir).ok();
    }
}
