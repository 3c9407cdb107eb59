use std::path::{Path, PathBuf};

/// A single file of a torrent's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentFile {
    /// 0 based position in the torrent's file list
    pub index: u64,
    /// length in bytes
    pub length: u64,
    /// offset of the file's first byte in the concatenated torrent content
    pub offset: u64,
    /// path relative to the torrent's root directory, for single file torrents
    /// this is the torrent's name
    pub path: PathBuf,
}

impl TorrentFile {
    /// the last path component
    #[inline]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|name| name.to_str())
    }

    #[inline]
    pub fn relative_path(&self) -> &Path {
        &self.path
    }

    /// whether the byte range `[begin, end)` of the torrent content overlaps
    /// this file
    pub fn overlaps(&self, begin: u64, end: u64) -> bool {
        self.length > 0 && begin < self.offset.saturating_add(self.length) && self.offset < end
    }
}
