//! # Checkpoint — Resumable Phase State Persistence
//!
//! Long computations persist their progress into a single JSON [`Document`]
//! holding one object per phase (`S2_trivial`, `S2_easy`, `S2_hard`,
//! `S2_lmo`, `P2`). Each phase object carries its key (`x`, `y`, `z` and,
//! where it matters, `c`), cumulative results and per-thread cursors. A phase
//! resumes only if its stored key matches the current invocation exactly;
//! anything else is discarded and the phase starts cold.
//!
//! Values that may exceed `i64` (x and the wide sums) are stored as decimal
//! strings.
//!
//! ## Stores
//!
//! - [`FileStore`]: the on-disk file, default `primecount.backup`.
//! - [`MemoryStore`]: serialized in memory, for tests.
//! - [`NullStore`]: checkpointing disabled.
//!
//! ## Atomic Writes
//!
//! Files are written atomically: write to a temp file, then rename.
//! This prevents corruption from mid-write crashes or power loss.
//!
//! ## Integrity
//!
//! A SHA-256 hash is stored alongside the JSON data. On load, the hash is
//! verified; corrupted files are skipped, falling back to the most recent
//! valid generation (up to 3 generations kept), then to an envelope-less
//! document, then to an empty one. A damaged checkpoint never fails a run.
//!
//! Single-process access only: two processes writing the same file is not
//! supported.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::warn;

use crate::wide::WideInt;

/// Number of backup generations to keep.
const GENERATIONS: usize = 3;

pub const DEFAULT_BACKUP_FILE: &str = "primecount.backup";

// ── Document ────────────────────────────────────────────────────

/// Identity of a phase computation. A stored phase is only reused when every
/// field matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseKey {
    pub x: String,
    pub y: i64,
    pub z: i64,
    pub c: Option<i64>,
}

impl PhaseKey {
    pub fn new<T: WideInt>(x: T, y: i64, z: i64) -> Self {
        PhaseKey {
            x: x.to_string(),
            y,
            z,
            c: None,
        }
    }

    pub fn with_c(mut self, c: i64) -> Self {
        self.c = Some(c);
        self
    }
}

/// Per-thread progress cursor: the last prime index claimed and the partial
/// sum accumulated so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadRecord<T> {
    pub b: i64,
    pub sum: T,
}

/// Whole-file JSON object, one nested object per phase.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    root: Map<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => Document { root },
            _ => Document::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn has_phase(&self, phase: &str) -> bool {
        self.root.get(phase).is_some_and(Value::is_object)
    }

    fn field(&self, phase: &str, field: &str) -> Option<&Value> {
        self.root.get(phase)?.as_object()?.get(field)
    }

    fn phase_mut(&mut self, phase: &str) -> &mut Map<String, Value> {
        let entry = self
            .root
            .entry(phase.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("phase entry was just replaced by an object"),
        }
    }

    pub fn get_i64(&self, phase: &str, field: &str) -> Option<i64> {
        self.field(phase, field)?.as_i64()
    }

    pub fn get_f64(&self, phase: &str, field: &str) -> Option<f64> {
        self.field(phase, field)?.as_f64()
    }

    /// Wide integers are decimal strings; plain JSON integers are accepted too.
    pub fn get_wide<T: WideInt>(&self, phase: &str, field: &str) -> Option<T> {
        match self.field(phase, field)? {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_i64().map(T::from_i64),
            _ => None,
        }
    }

    pub fn get_value(&self, phase: &str, field: &str) -> Option<&Value> {
        self.field(phase, field)
    }

    pub fn set_i64(&mut self, phase: &str, field: &str, value: i64) {
        self.phase_mut(phase).insert(field.to_string(), value.into());
    }

    pub fn set_f64(&mut self, phase: &str, field: &str, value: f64) {
        self.phase_mut(phase).insert(field.to_string(), value.into());
    }

    pub fn set_wide<T: WideInt>(&mut self, phase: &str, field: &str, value: T) {
        self.phase_mut(phase)
            .insert(field.to_string(), Value::String(value.to_string()));
    }

    pub fn set_value(&mut self, phase: &str, field: &str, value: Value) {
        self.phase_mut(phase).insert(field.to_string(), value);
    }

    /// Drop everything stored for `phase`.
    pub fn erase(&mut self, phase: &str) {
        self.root.remove(phase);
    }

    /// True if `phase` exists and was written for exactly this key.
    pub fn is_resume(&self, phase: &str, key: &PhaseKey) -> bool {
        if !self.has_phase(phase) {
            return false;
        }
        let x_matches = matches!(self.field(phase, "x"), Some(Value::String(s)) if *s == key.x);
        let c_matches = match key.c {
            Some(c) => self.get_i64(phase, "c") == Some(c),
            None => true,
        };
        x_matches
            && self.get_i64(phase, "y") == Some(key.y)
            && self.get_i64(phase, "z") == Some(key.z)
            && c_matches
    }

    pub fn write_key(&mut self, phase: &str, key: &PhaseKey) {
        let map = self.phase_mut(phase);
        map.insert("x".to_string(), Value::String(key.x.clone()));
        map.insert("y".to_string(), key.y.into());
        map.insert("z".to_string(), key.z.into());
        if let Some(c) = key.c {
            map.insert("c".to_string(), c.into());
        }
    }

    pub fn thread_record<T: WideInt>(
        &self,
        phase: &str,
        thread: usize,
        sum_field: &str,
    ) -> Option<ThreadRecord<T>> {
        let record = self.field(phase, &format!("thread{}", thread))?.as_object()?;
        let b = record.get("b")?.as_i64()?;
        let sum = match record.get(sum_field)? {
            Value::String(s) => s.parse().ok()?,
            Value::Number(n) => T::from_i64(n.as_i64()?),
            _ => return None,
        };
        Some(ThreadRecord { b, sum })
    }

    pub fn set_thread_record<T: WideInt>(
        &mut self,
        phase: &str,
        thread: usize,
        sum_field: &str,
        record: ThreadRecord<T>,
    ) {
        let mut map = Map::new();
        map.insert("b".to_string(), record.b.into());
        map.insert(sum_field.to_string(), Value::String(record.sum.to_string()));
        self.phase_mut(phase)
            .insert(format!("thread{}", thread), Value::Object(map));
    }
}

// ── Stores ──────────────────────────────────────────────────────

/// Whole-document persistence. `load` never fails: unreadable state is an
/// empty document.
pub trait BackupStore: Send + Sync {
    fn load(&self) -> Document;
    fn store(&self, doc: &Document) -> Result<()>;
}

/// Checkpointing disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStore;

impl BackupStore for NullStore {
    fn load(&self) -> Document {
        Document::new()
    }

    fn store(&self, _doc: &Document) -> Result<()> {
        Ok(())
    }
}

/// Keeps the last stored document as serialized JSON, so a round trip goes
/// through the same encoding as the file store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    json: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `store` calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn raw(&self) -> Option<String> {
        self.json.lock().ok()?.clone()
    }

    /// Replace the stored JSON text, e.g. to simulate an older or damaged file.
    pub fn set_raw(&self, json: &str) {
        if let Ok(mut guard) = self.json.lock() {
            *guard = Some(json.to_string());
        }
    }
}

impl BackupStore for MemoryStore {
    fn load(&self) -> Document {
        self.raw()
            .and_then(|json| serde_json::from_str(&json).ok())
            .map(Document::from_value)
            .unwrap_or_default()
    }

    fn store(&self, doc: &Document) -> Result<()> {
        let json = serde_json::to_string_pretty(&doc.to_value())?;
        *self
            .json
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))? = Some(json);
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Wrapper that includes a SHA-256 checksum for integrity verification.
#[derive(Serialize, Deserialize)]
struct CheckpointEnvelope {
    checksum: String,
    data: Value,
}

/// Compute SHA-256 hex digest of a string.
fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Return the path for generation `gen` (0 = current, 1 = .1, 2 = .2, ...).
fn generation_path(base: &Path, gen: usize) -> PathBuf {
    if gen == 0 {
        base.to_path_buf()
    } else {
        let mut p = base.as_os_str().to_os_string();
        p.push(format!(".{}", gen));
        PathBuf::from(p)
    }
}

/// Pretty-printed JSON checkpoint file with rotating generations.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file, its older generations and any leftover temp file.
    pub fn clear(&self) {
        for gen in 0..GENERATIONS {
            let _ = fs::remove_file(generation_path(&self.path, gen));
        }
        let _ = fs::remove_file(self.path.with_extension("tmp"));
    }

    fn load_single(path: &Path) -> Option<Document> {
        let raw = fs::read_to_string(path).ok()?;
        let envelope: CheckpointEnvelope = serde_json::from_str(&raw).ok()?;

        let data_str = serde_json::to_string_pretty(&envelope.data).ok()?;
        let expected = sha256_hex(&data_str);
        if expected != envelope.checksum {
            warn!(
                path = %path.display(),
                expected = &expected[..12],
                got = &envelope.checksum[..12.min(envelope.checksum.len())],
                "checkpoint integrity check failed"
            );
            return None;
        }

        Some(Document::from_value(envelope.data))
    }
}

impl Default for FileStore {
    fn default() -> Self {
        FileStore::new(DEFAULT_BACKUP_FILE)
    }
}

impl BackupStore for FileStore {
    /// Newest valid generation, then a bare document, then empty.
    fn load(&self) -> Document {
        for gen in 0..GENERATIONS {
            let p = generation_path(&self.path, gen);
            if let Some(doc) = Self::load_single(&p) {
                if gen > 0 {
                    warn!(generation = gen, path = %p.display(), "recovered checkpoint from older generation");
                }
                return doc;
            }
        }

        // Envelope-less file, e.g. written by hand
        let bare = fs::read_to_string(&self.path)
            .ok()
            .and_then(|data| serde_json::from_str::<Value>(&data).ok())
            .filter(|v| v.is_object() && v.get("checksum").is_none());
        match bare {
            Some(value) => {
                warn!(path = %self.path.display(), "loaded checkpoint without checksum");
                Document::from_value(value)
            }
            None => Document::new(),
        }
    }

    /// Rotation: current → .1 → .2 (oldest .2 is discarded).
    /// The new file is written atomically via a .tmp file.
    fn store(&self, doc: &Document) -> Result<()> {
        for gen in (1..GENERATIONS).rev() {
            let src = generation_path(&self.path, gen - 1);
            let dst = generation_path(&self.path, gen);
            if src.exists() {
                let _ = fs::rename(&src, &dst);
            }
        }

        let data = doc.to_value();
        let data_str = serde_json::to_string_pretty(&data)?;
        let checksum = sha256_hex(&data_str);

        let envelope = CheckpointEnvelope { checksum, data };
        let json = serde_json::to_string_pretty(&envelope)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &json)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the document model and the three stores.
    //!
    //! File-store tests run in a `tempfile` directory and cover the
    //! generation fallback, the integrity check and the envelope-less
    //! fallback. Phase-level resume behavior is covered by the engines' own
    //! tests and `tests/checkpoint_tests.rs`.

    use super::*;
    use std::io::Write;

    fn key() -> PhaseKey {
        PhaseKey::new(10i64.pow(12), 20_000, 50_000_000).with_c(6)
    }

    // ── Document ────────────────────────────────────────────────

    #[test]
    fn typed_fields_round_trip() {
        let mut doc = Document::new();
        doc.set_i64("S2_easy", "start", 42);
        doc.set_f64("S2_easy", "percent", 12.5);
        doc.set_wide("S2_easy", "s2_easy", 10i128.pow(25));

        assert_eq!(doc.get_i64("S2_easy", "start"), Some(42));
        assert_eq!(doc.get_f64("S2_easy", "percent"), Some(12.5));
        assert_eq!(doc.get_wide::<i128>("S2_easy", "s2_easy"), Some(10i128.pow(25)));
        assert_eq!(doc.get_i64("S2_easy", "missing"), None);
        assert_eq!(doc.get_i64("missing", "start"), None);
    }

    /// A 128-bit value must survive as a string; JSON numbers would lose it.
    #[test]
    fn wide_values_are_decimal_strings() {
        let mut doc = Document::new();
        doc.set_wide("P2", "p2", -170_141_183_460_469_231_731_687_303_715_884_105_727i128);
        assert_eq!(
            doc.get_value("P2", "p2"),
            Some(&Value::String("-170141183460469231731687303715884105727".to_string()))
        );
    }

    #[test]
    fn is_resume_requires_exact_key() {
        let mut doc = Document::new();
        doc.write_key("S2_hard", &key());
        assert!(doc.is_resume("S2_hard", &key()));

        let mut other = key();
        other.y += 1;
        assert!(!doc.is_resume("S2_hard", &other));

        let mut other = key();
        other.x = "1000000000001".to_string();
        assert!(!doc.is_resume("S2_hard", &other));

        let other = PhaseKey::new(10i64.pow(12), 20_000, 50_000_000).with_c(5);
        assert!(!doc.is_resume("S2_hard", &other));

        assert!(!doc.is_resume("S2_easy", &key()));
    }

    #[test]
    fn key_without_c_ignores_stored_c() {
        let mut doc = Document::new();
        doc.write_key("S2_easy", &key());
        let no_c = PhaseKey::new(10i64.pow(12), 20_000, 50_000_000);
        assert!(doc.is_resume("S2_easy", &no_c));
    }

    #[test]
    fn erase_removes_phase_only() {
        let mut doc = Document::new();
        doc.write_key("S2_easy", &key());
        doc.write_key("P2", &key());
        doc.erase("S2_easy");
        assert!(!doc.has_phase("S2_easy"));
        assert!(doc.has_phase("P2"));
    }

    #[test]
    fn thread_records_round_trip() {
        let mut doc = Document::new();
        doc.set_thread_record("S2_easy", 3, "s2_easy", ThreadRecord { b: 17, sum: -5i64 });
        let rec: ThreadRecord<i64> = doc.thread_record("S2_easy", 3, "s2_easy").unwrap();
        assert_eq!(rec, ThreadRecord { b: 17, sum: -5 });
        assert!(doc.thread_record::<i64>("S2_easy", 4, "s2_easy").is_none());
    }

    #[test]
    fn non_object_phase_is_replaced_on_write() {
        let doc_json = serde_json::json!({ "S2_easy": 5 });
        let mut doc = Document::from_value(doc_json);
        assert!(!doc.has_phase("S2_easy"));
        doc.set_i64("S2_easy", "start", 1);
        assert_eq!(doc.get_i64("S2_easy", "start"), Some(1));
    }

    // ── MemoryStore / NullStore ─────────────────────────────────

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), Document::new());
        let mut doc = Document::new();
        doc.write_key("S2_trivial", &key());
        store.store(&doc).unwrap();
        assert_eq!(store.load(), doc);
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn memory_store_garbage_loads_empty() {
        let store = MemoryStore::new();
        store.set_raw("{ not json");
        assert_eq!(store.load(), Document::new());
    }

    #[test]
    fn null_store_never_remembers() {
        let store = NullStore;
        let mut doc = Document::new();
        doc.set_i64("P2", "y", 1);
        store.store(&doc).unwrap();
        assert_eq!(store.load(), Document::new());
    }

    // ── FileStore ───────────────────────────────────────────────

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("primecount.backup"));
        let mut doc = Document::new();
        doc.write_key("S2_easy", &key());
        doc.set_thread_record("S2_easy", 0, "s2_easy", ThreadRecord { b: 9, sum: 123i128 });
        store.store(&doc).unwrap();
        assert_eq!(store.load(), doc);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("absent.backup"));
        assert_eq!(store.load(), Document::new());
    }

    #[test]
    fn file_store_falls_back_to_previous_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primecount.backup");
        let store = FileStore::new(&path);

        let mut first = Document::new();
        first.set_i64("P2", "y", 1);
        store.store(&first).unwrap();
        let mut second = Document::new();
        second.set_i64("P2", "y", 2);
        store.store(&second).unwrap();

        // Corrupt the current generation; .1 still holds the first document
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(b"{\"checksum\":\"0000\",\"data\":{}}").unwrap();

        assert_eq!(store.load(), first);
    }

    #[test]
    fn file_store_loads_bare_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primecount.backup");
        fs::write(&path, r#"{ "P2": { "x": "1000", "y": 10, "z": 100 } }"#).unwrap();
        let doc = FileStore::new(&path).load();
        assert_eq!(doc.get_i64("P2", "z"), Some(100));
    }

    #[test]
    fn file_store_unparseable_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primecount.backup");
        fs::write(&path, "garbage").unwrap();
        assert_eq!(FileStore::new(&path).load(), Document::new());
    }

    #[test]
    fn file_store_keeps_three_generations() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("primecount.backup");
        let store = FileStore::new(&path);
        for i in 0..5 {
            let mut doc = Document::new();
            doc.set_i64("P2", "y", i);
            store.store(&doc).unwrap();
        }
        assert!(path.exists());
        assert!(generation_path(&path, 1).exists());
        assert!(generation_path(&path, 2).exists());
        assert!(!generation_path(&path, 3).exists());

        store.clear();
        assert!(!path.exists());
        assert!(!generation_path(&path, 2).exists());
    }
}
