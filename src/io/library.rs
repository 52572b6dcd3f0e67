//! Pattern persistence: the autosaved current pattern and the named library.
//!
//! Storage is a plain key/value text store. The file-backed store keeps one
//! JSON file per key in a directory; if the directory cannot be used the
//! [`Fallback`] wrapper logs once and carries on in memory, so saving never
//! takes the editor down.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::Result;
use crate::sequencing::pattern::Pattern;

pub const CURRENT_KEY: &str = "current_pattern";
pub const LIBRARY_KEY: &str = "library";
/// Where an unusable library is copied before it gets overwritten
pub const LIBRARY_BACKUP_KEY: &str = "library.bak";

const UNNAMED: &str = "Unnamed";

pub trait Storage {
    fn read(&mut self, key: &str) -> Result<Option<String>>;
    fn write(&mut self, key: &str, text: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: HashMap<String, String>,
}

impl Storage for MemoryStorage {
    fn read(&mut self, key: &str) -> Result<Option<String>> {
        Ok(self.items.get(key).cloned())
    }

    fn write(&mut self, key: &str, text: &str) -> Result<()> {
        self.items.insert(key.to_string(), text.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key under a directory
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for JsonFileStorage {
    fn read(&mut self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, text: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        // Write then rename so a crash never leaves half a file
        let tmp = self.dir.join(format!(".{key}.json.tmp"));
        fs::write(&tmp, text)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }
}

/// Uses `primary` until it fails once, then memory only
#[derive(Debug, Clone)]
pub struct Fallback<S> {
    primary: Option<S>,
    memory: MemoryStorage,
}

impl<S: Storage> Fallback<S> {
    pub fn new(primary: S) -> Self {
        Self {
            primary: Some(primary),
            memory: MemoryStorage::default(),
        }
    }

    /// In-memory from the start
    pub fn memory_only() -> Self {
        Self {
            primary: None,
            memory: MemoryStorage::default(),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.primary.is_none()
    }

    fn degrade(&mut self, err: &crate::Error) {
        warn!(error = %err, "storage unavailable, keeping patterns in memory");
        self.primary = None;
    }
}

impl<S: Storage> Storage for Fallback<S> {
    fn read(&mut self, key: &str) -> Result<Option<String>> {
        if let Some(primary) = &mut self.primary {
            match primary.read(key) {
                Ok(text) => return Ok(text),
                Err(e) => self.degrade(&e),
            }
        }
        self.memory.read(key)
    }

    fn write(&mut self, key: &str, text: &str) -> Result<()> {
        self.memory.write(key, text)?;
        if let Some(primary) = &mut self.primary {
            if let Err(e) = primary.write(key, text) {
                self.degrade(&e);
            }
        }
        Ok(())
    }
}

/// A saved pattern with its name and tempo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub id: String,
    pub name: String,
    pub bpm: f64,
    /// RFC 3339 timestamp
    pub created_at: String,
    pub pattern: Pattern,
}

impl LibraryEntry {
    pub fn new<R: Rng + ?Sized>(
        name: &str,
        bpm: f64,
        pattern: Pattern,
        now: SystemTime,
        rng: &mut R,
    ) -> Self {
        let name = name.trim();
        Self {
            id: make_id(now, rng),
            name: if name.is_empty() { UNNAMED.to_string() } else { name.to_string() },
            bpm,
            created_at: humantime::format_rfc3339_millis(now).to_string(),
            pattern,
        }
    }

    /// Lenient parse. Only a missing id makes an entry unusable.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let id = obj.get("id")?.as_str()?.to_string();
        Some(Self {
            id,
            name: obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(UNNAMED)
                .to_string(),
            bpm: obj.get("bpm").and_then(Value::as_f64).unwrap_or(120.0),
            created_at: obj
                .get("createdAt")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            pattern: Pattern::from_value(obj.get("pattern").unwrap_or(&Value::Null)),
        })
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let value: Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        Ok(Self::from_value(&value))
    }
}

pub const PRESET_TYPE: &str = "TB303_TR909_PRESET";
const UNNAMED_PRESET: &str = "Unnamed Preset";

/// Shareable preset file: the pattern under `tb303` with a name and tempo
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preset {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub created_at: String,
    pub bpm: f64,
    pub tb303: Pattern,
}

impl Preset {
    pub fn new(name: &str, bpm: f64, pattern: Pattern, now: SystemTime) -> Self {
        let name = name.trim();
        Self {
            kind: PRESET_TYPE.to_string(),
            name: if name.is_empty() { UNNAMED_PRESET.to_string() } else { name.to_string() },
            created_at: humantime::format_rfc3339_millis(now).to_string(),
            bpm,
            tb303: pattern,
        }
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// `<unix millis>_<6 hex digits>`
fn make_id<R: Rng + ?Sized>(now: SystemTime, rng: &mut R) -> String {
    let millis = now.duration_since(UNIX_EPOCH).map(|d| d.as_millis()).unwrap_or(0);
    let suffix: u32 = rng.gen_range(0..0x100_0000);
    format!("{millis}_{suffix:06x}")
}

/// Saved patterns, newest first
pub struct Library<S> {
    storage: S,
    entries: Vec<LibraryEntry>,
    /// The stored library could not be used; back it up before writing
    needs_backup: bool,
}

impl<S: Storage> Library<S> {
    /// Read the library. Unreadable or malformed data gives an empty list,
    /// and the stored copy is moved to [`LIBRARY_BACKUP_KEY`] before the
    /// first save replaces it.
    pub fn open(mut storage: S) -> Self {
        let (entries, needs_backup) = match storage.read(LIBRARY_KEY) {
            Ok(Some(text)) => match parse_entries(&text) {
                Some(entries) => (entries, false),
                None => (Vec::new(), true),
            },
            Ok(None) => (Vec::new(), false),
            Err(e) => {
                warn!(error = %e, "could not read pattern library");
                (Vec::new(), true)
            }
        };
        debug!(count = entries.len(), "library loaded");
        Self {
            storage,
            entries,
            needs_backup,
        }
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Add an entry at the front and persist the list
    pub fn add(&mut self, entry: LibraryEntry) -> Result<&LibraryEntry> {
        self.entries.insert(0, entry);
        self.persist()?;
        Ok(&self.entries[0])
    }

    /// Snapshot `pattern` under `name`; also becomes the current pattern
    pub fn save_pattern(&mut self, name: &str, bpm: f64, pattern: &Pattern) -> Result<&LibraryEntry> {
        let entry = LibraryEntry::new(name, bpm, pattern.clone(), SystemTime::now(), &mut rand::thread_rng());
        self.save_current(pattern)?;
        self.add(entry)
    }

    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        if self.entries.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// The autosaved pattern, if any
    pub fn load_current(&mut self) -> Option<Pattern> {
        match self.storage.read(CURRENT_KEY) {
            Ok(Some(text)) => match serde_json::from_str::<Value>(&text) {
                Ok(value) => Some(Pattern::from_value(&value)),
                Err(e) => {
                    warn!(error = %e, "stored pattern is not valid JSON");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "could not read stored pattern");
                None
            }
        }
    }

    pub fn save_current(&mut self, pattern: &Pattern) -> Result<()> {
        self.storage.write(CURRENT_KEY, &pattern.to_json_pretty())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn persist(&mut self) -> Result<()> {
        if self.needs_backup {
            self.back_up()?;
        }
        let text = serde_json::to_string_pretty(&self.entries)?;
        self.storage.write(LIBRARY_KEY, &text)
    }

    /// Copy whatever is stored under the library key aside. A failed copy
    /// blocks the save so the original is never lost.
    fn back_up(&mut self) -> Result<()> {
        if let Some(text) = self.storage.read(LIBRARY_KEY)? {
            self.storage.write(LIBRARY_BACKUP_KEY, &text)?;
            warn!(key = LIBRARY_BACKUP_KEY, "unusable pattern library backed up");
        }
        self.needs_backup = false;
        Ok(())
    }
}

/// `None` if the text is not a JSON list
fn parse_entries(text: &str) -> Option<Vec<LibraryEntry>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => Some(items.iter().filter_map(LibraryEntry::from_value).collect()),
        Ok(_) => {
            warn!("pattern library is not a list, ignoring it");
            None
        }
        Err(e) => {
            warn!(error = %e, "pattern library is not valid JSON, ignoring it");
            None
        }
    }
}
