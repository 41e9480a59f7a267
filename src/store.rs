//! Durable id → position mapping.
//!
//! The store is deliberately dumb: two operations, no notion of overlay
//! lifecycle. Positions outlive the overlays that produced them and are
//! handed back to a future `open` with the same id. A corrupt or missing
//! backing file degrades to "no data"; callers always have the cascade
//! default to fall back on, so nothing here surfaces an error to them.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::overlay::Point;

pub trait PositionStore {
    fn load(&self, id: &str) -> Option<Point>;

    /// Persist a committed position. Implementations log and swallow their
    /// own failures; drag commit must never fail the caller.
    fn save(&mut self, id: &str, position: Point);
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("position file i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("position file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// File-backed store keeping the whole namespace as one JSON object.
///
/// The file is read once at open; saves rewrite it. Write volume is bounded
/// by the drag-commit policy upstream (one save per completed drag).
pub struct JsonPositionStore {
    path: PathBuf,
    positions: HashMap<String, Point>,
}

impl JsonPositionStore {
    /// Open a store at `path`, loading whatever is salvageable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let positions = match read_positions(&path) {
            Ok(positions) => positions,
            Err(StoreError::Io(err)) if err.kind() == io::ErrorKind::NotFound => HashMap::new(),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "position file unreadable; starting empty");
                HashMap::new()
            }
        };
        Self { path, positions }
    }

    /// Conventional per-user location for the position file.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("overlay-wm").join("positions.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    fn write(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.positions)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

impl PositionStore for JsonPositionStore {
    fn load(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    fn save(&mut self, id: &str, position: Point) {
        self.positions.insert(id.to_string(), position);
        if let Err(err) = self.write() {
            tracing::warn!(path = %self.path.display(), %err, "failed to persist overlay position");
        }
    }
}

fn read_positions(path: &Path) -> Result<HashMap<String, Point>, StoreError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// In-memory store for hosts that do not want disk I/O, and for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    positions: HashMap<String, Point>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(positions: impl IntoIterator<Item = (String, Point)>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }
}

impl PositionStore for MemoryStore {
    fn load(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    fn save(&mut self, id: &str, position: Point) {
        self.positions.insert(id.to_string(), position);
    }
}
