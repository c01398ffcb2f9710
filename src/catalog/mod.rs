// Video catalog: file records grouped into per-video assets by base name

pub mod events;
pub mod scan;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::constants::{EXT_BACKUP, EXT_HIGH_DEF, EXT_LOW_DEF, EXT_PREVIEW, EXT_REFRAME};
use crate::error::{ReframeError, Result};
pub use events::CatalogEvent;

/// Classification of a file by its trailing extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FileKind {
    HighDef,
    LowDef,
    Preview,
    Reframe,
    Backup,
    Other,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext {
            EXT_HIGH_DEF => FileKind::HighDef,
            EXT_LOW_DEF => FileKind::LowDef,
            EXT_PREVIEW => FileKind::Preview,
            EXT_REFRAME => FileKind::Reframe,
            EXT_BACKUP => FileKind::Backup,
            _ => FileKind::Other,
        }
    }
}

/// Coarse filesystem entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Directory,
    Symlink,
    Other,
}

/// One directory entry as seen at stat time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub entry_type: EntryType,
}

impl FileRecord {
    /// Text before the first dot.
    pub fn base_name(&self) -> &str {
        base_name_of(&self.name)
    }

    /// Text after the last dot (empty when the name has no dot).
    pub fn extension(&self) -> &str {
        match self.name.rfind('.') {
            Some(i) => &self.name[i + 1..],
            None => "",
        }
    }

    pub fn kind(&self) -> FileKind {
        FileKind::from_extension(self.extension())
    }
}

/// Text before the first dot of a file name.
pub fn base_name_of(name: &str) -> &str {
    match name.find('.') {
        Some(i) => &name[..i],
        None => name,
    }
}

/// Part of a file name strictly between the first and last dots.
pub fn reframe_name_of(name: &str) -> &str {
    match (name.find('.'), name.rfind('.')) {
        (Some(first), Some(last)) if last > first => &name[first + 1..last],
        _ => "",
    }
}

/// A `.reframe` companion file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReframeRecord {
    pub file: FileRecord,
}

impl ReframeRecord {
    pub fn new(file: FileRecord) -> Self {
        Self { file }
    }

    pub fn reframe_name(&self) -> &str {
        reframe_name_of(&self.file.name)
    }

    pub fn name(&self) -> &str {
        &self.file.name
    }

    pub fn path(&self) -> &Path {
        &self.file.path
    }
}

/// Which primary video file of an asset to work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VideoQuality {
    High,
    Low,
}

/// All files sharing one base name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoAsset {
    pub base_name: String,
    pub high_def: Option<FileRecord>,
    pub low_def: Option<FileRecord>,
    pub preview: Option<FileRecord>,
    /// Directory enumeration order. Not resorted.
    pub reframes: Vec<ReframeRecord>,
    pub backups: Vec<FileRecord>,
    /// Unclassified files. Non-empty means a naming anomaly.
    pub other: Vec<FileRecord>,
}

impl VideoAsset {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
            high_def: None,
            low_def: None,
            preview: None,
            reframes: Vec::new(),
            backups: Vec::new(),
            other: Vec::new(),
        }
    }

    pub fn video_file(&self, quality: VideoQuality) -> Option<&FileRecord> {
        match quality {
            VideoQuality::High => self.high_def.as_ref(),
            VideoQuality::Low => self.low_def.as_ref(),
        }
    }

    pub fn reframe(&self, reframe_name: &str) -> Option<&ReframeRecord> {
        self.reframes.iter().find(|r| r.reframe_name() == reframe_name)
    }

    pub fn reframe_index(&self, reframe_name: &str) -> Option<usize> {
        self.reframes.iter().position(|r| r.reframe_name() == reframe_name)
    }

    pub fn has_reframe(&self, reframe_name: &str) -> bool {
        self.reframe_index(reframe_name).is_some()
    }

    /// Every file tracked by this asset.
    pub fn files(&self) -> impl Iterator<Item = &FileRecord> {
        self.high_def.iter()
            .chain(self.low_def.iter())
            .chain(self.preview.iter())
            .chain(self.reframes.iter().map(|r| &r.file))
            .chain(self.backups.iter())
            .chain(self.other.iter())
    }

    /// Assign a record into its bucket. Singleton slots are last-write-wins;
    /// a file already held under the same name is replaced where it sits.
    fn place(&mut self, record: FileRecord) -> FileKind {
        let kind = record.kind();
        match kind {
            FileKind::HighDef => replace_slot(&mut self.high_def, record),
            FileKind::LowDef => replace_slot(&mut self.low_def, record),
            FileKind::Preview => replace_slot(&mut self.preview, record),
            FileKind::Reframe => match self.reframe_index(reframe_name_of(&record.name)) {
                Some(index) => self.reframes[index] = ReframeRecord::new(record),
                None => self.reframes.push(ReframeRecord::new(record)),
            },
            FileKind::Backup => upsert_by_name(&mut self.backups, record),
            FileKind::Other => {
                log::warn!("Unclassified file '{}' in video '{}'", record.name, self.base_name);
                upsert_by_name(&mut self.other, record);
            }
        }
        kind
    }

    fn holds_file(&self, name: &str) -> bool {
        self.files().any(|f| f.name == name)
    }
}

fn upsert_by_name(bucket: &mut Vec<FileRecord>, record: FileRecord) {
    match bucket.iter_mut().find(|f| f.name == record.name) {
        Some(existing) => *existing = record,
        None => bucket.push(record),
    }
}

fn replace_slot(slot: &mut Option<FileRecord>, record: FileRecord) {
    if let Some(previous) = slot.as_ref() {
        if previous.name != record.name {
            log::warn!(
                "'{}' replaces '{}' in the same slot (last write wins)",
                record.name,
                previous.name
            );
        }
    }
    *slot = Some(record);
}

/// In-memory catalog of one working directory.
///
/// Mutating methods take `&mut self`; a host sharing the catalog between
/// threads wraps it in a `Mutex`, which serializes mutations per directory.
#[derive(Debug)]
pub struct Catalog {
    directory: PathBuf,
    videos: HashMap<String, VideoAsset>,
    events: Vec<CatalogEvent>,
}

impl Catalog {
    /// An empty catalog bound to a directory. Nothing is read from disk.
    pub fn empty(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            videos: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Scan a directory and build its catalog.
    pub fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        let mut catalog = Self::empty(directory);
        catalog.rescan()?;
        Ok(catalog)
    }

    /// Build a catalog from already classified records.
    pub fn from_records(directory: impl Into<PathBuf>, records: Vec<FileRecord>) -> Self {
        let mut catalog = Self::empty(directory);
        catalog.videos = aggregate(records);
        catalog
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full rebuild from disk. On error the previous contents are kept.
    pub fn rescan(&mut self) -> Result<()> {
        let records = scan::scan_directory(&self.directory)?;
        self.videos = aggregate(records);
        log::info!(
            "Scanned {}: {} videos",
            self.directory.display(),
            self.videos.len()
        );
        self.events.push(CatalogEvent::Rescanned {
            video_count: self.videos.len(),
        });
        Ok(())
    }

    /// Rebuild one asset from the files currently on disk under its prefix.
    /// The asset is dropped when no files remain.
    pub fn rescan_prefix(&mut self, base_name: &str) -> Result<Option<&VideoAsset>> {
        let records = scan::scan_prefix(&self.directory, base_name)?;
        let existed = self.videos.remove(base_name).is_some();

        if records.is_empty() {
            if existed {
                self.events.push(CatalogEvent::VideoRemoved {
                    base_name: base_name.to_string(),
                });
            }
            return Ok(None);
        }

        let mut asset = VideoAsset::new(base_name);
        for record in records {
            asset.place(record);
        }
        self.videos.insert(base_name.to_string(), asset);
        self.events.push(if existed {
            CatalogEvent::VideoUpdated { base_name: base_name.to_string() }
        } else {
            CatalogEvent::VideoAdded { base_name: base_name.to_string() }
        });
        Ok(self.videos.get(base_name))
    }

    /// Stat one file and place it without rescanning. Unrecognized
    /// extensions land in the asset's `other` bucket.
    pub fn add_file(&mut self, path: &Path) -> Result<FileKind> {
        let record = scan::stat_file(path)?;
        self.insert_record(record)
    }

    pub(crate) fn insert_record(&mut self, record: FileRecord) -> Result<FileKind> {
        let base_name = record.base_name().to_string();
        if base_name.is_empty() {
            return Err(ReframeError::InvalidName(record.name));
        }

        if !self.videos.contains_key(&base_name) {
            self.videos.insert(base_name.clone(), VideoAsset::new(&base_name));
            self.events.push(CatalogEvent::VideoAdded { base_name: base_name.clone() });
        }

        let asset = self
            .videos
            .get_mut(&base_name)
            .ok_or_else(|| ReframeError::FileMissing(base_name.clone()))?;
        let already_held = asset.holds_file(&record.name);

        let event = match (record.kind(), already_held) {
            (FileKind::Reframe, true) => {
                let reframe_name = reframe_name_of(&record.name).to_string();
                CatalogEvent::ReframeUpdated {
                    base_name: base_name.clone(),
                    old_reframe_name: reframe_name.clone(),
                    reframe_name,
                }
            }
            (FileKind::Reframe, false) => CatalogEvent::ReframeAdded {
                base_name: base_name.clone(),
                reframe_name: reframe_name_of(&record.name).to_string(),
            },
            (_, true) => CatalogEvent::VideoUpdated { base_name: base_name.clone() },
            (kind, false) => CatalogEvent::FileAdded {
                base_name: base_name.clone(),
                name: record.name.clone(),
                kind,
            },
        };

        let kind = asset.place(record);
        self.events.push(event);
        Ok(kind)
    }

    /// Swap the reframe at `index` for a freshly stat'ed record, keeping its position.
    pub(crate) fn replace_reframe(&mut self, base_name: &str, index: usize, record: ReframeRecord) -> Result<()> {
        let asset = self
            .videos
            .get_mut(base_name)
            .ok_or_else(|| ReframeError::FileMissing(base_name.to_string()))?;
        let slot = asset
            .reframes
            .get_mut(index)
            .ok_or_else(|| ReframeError::FileMissing(record.name().to_string()))?;
        let old_name = slot.reframe_name().to_string();
        let new_name = record.reframe_name().to_string();
        *slot = record;
        self.events.push(CatalogEvent::ReframeUpdated {
            base_name: base_name.to_string(),
            old_reframe_name: old_name,
            reframe_name: new_name,
        });
        Ok(())
    }

    pub(crate) fn remove_reframe(&mut self, base_name: &str, index: usize) -> Option<ReframeRecord> {
        let asset = self.videos.get_mut(base_name)?;
        if index >= asset.reframes.len() {
            return None;
        }
        let removed = asset.reframes.remove(index);
        self.events.push(CatalogEvent::ReframeRemoved {
            base_name: base_name.to_string(),
            reframe_name: removed.reframe_name().to_string(),
        });
        Some(removed)
    }

    pub(crate) fn remove_video(&mut self, base_name: &str) -> Option<VideoAsset> {
        let removed = self.videos.remove(base_name)?;
        self.events.push(CatalogEvent::VideoRemoved {
            base_name: base_name.to_string(),
        });
        Some(removed)
    }

    pub fn video(&self, base_name: &str) -> Option<&VideoAsset> {
        self.videos.get(base_name)
    }

    /// Look up a video, failing with `FileMissing` when it is not cataloged.
    pub fn require_video(&self, base_name: &str) -> Result<&VideoAsset> {
        self.video(base_name)
            .ok_or_else(|| ReframeError::FileMissing(format!("video '{}'", base_name)))
    }

    pub fn contains(&self, base_name: &str) -> bool {
        self.videos.contains_key(base_name)
    }

    pub fn videos(&self) -> impl Iterator<Item = &VideoAsset> {
        self.videos.values()
    }

    /// Videos ordered by base name, for display.
    pub fn sorted_videos(&self) -> Vec<&VideoAsset> {
        let mut videos: Vec<&VideoAsset> = self.videos.values().collect();
        videos.sort_by(|a, b| a.base_name.cmp(&b.base_name));
        videos
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    /// Drain the change events accumulated since the last call.
    pub fn take_events(&mut self) -> Vec<CatalogEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Group records into assets keyed by base name.
pub fn aggregate(records: Vec<FileRecord>) -> HashMap<String, VideoAsset> {
    let mut videos: HashMap<String, VideoAsset> = HashMap::new();

    for record in records {
        let base_name = record.base_name().to_string();
        if base_name.is_empty() {
            log::debug!("Skipping '{}': empty base name", record.name);
            continue;
        }
        videos
            .entry(base_name.clone())
            .or_insert_with(|| VideoAsset::new(base_name))
            .place(record);
    }

    videos
}
