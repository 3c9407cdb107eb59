use std::convert::TryFrom;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use reqwest::Url;

use crate::bencode::field::{
    expect_bytes, expect_dict, expect_int, expect_list, expect_str, expect_u64, required,
};
use crate::bencode::{self, Dictionary, Value};
use crate::bitfield::Bitfield;
use crate::error::{Error, Result};
use crate::util::{InfoHash, ShaHash, SHA_HASH_LEN};

mod file;

pub use self::file::TorrentFile;

/// Which bytes the info hash is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoHashSource {
    /// SHA-1 of the canonical re-encoding of the decoded `info` dictionary.
    ///
    /// Stable regardless of the key order in the file, but differs from what
    /// trackers expect if the file's `info` dictionary was not sorted.
    Canonical,
    /// SHA-1 of the `info` value's bytes exactly as they appear in the file.
    Raw,
}

impl Default for InfoHashSource {
    fn default() -> Self {
        InfoHashSource::Canonical
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    pub info_hash: InfoHashSource,
}

/// Validated, immutable metadata of a `.torrent` file.
#[derive(Clone, PartialEq, Eq)]
pub struct TorrentMetadata {
    /// the URL of the tracker
    announce: String,
    /// tiers of backup trackers
    announce_list: Vec<Vec<String>>,
    info_hash: InfoHash,
    /// file name of a single file torrent, root directory otherwise
    name: PathBuf,
    /// number of bytes in each piece, the last one may be shorter
    piece_length: u64,
    /// each is the SHA-1 hash of the piece at the corresponding index
    pieces: Vec<ShaHash>,
    files: Vec<TorrentFile>,
    /// sum of all file lengths, checked against overflow while parsing
    total_length: u64,
    multi_file: bool,
    private: bool,
    comment: Option<String>,
    created_by: Option<String>,
    creation_date: Option<i64>,
    encoding: Option<String>,
}

impl fmt::Debug for TorrentMetadata {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "TorrentMetadata {{ announce: {:?}, info_hash: {}, name: {:?}, piece_length: {}, pieces: {}, files: {:?} }}",
            self.announce,
            self.info_hash,
            self.name,
            self.piece_length,
            self.pieces.len(),
            self.files
        )
    }
}

impl TorrentMetadata {
    /// Parses the raw bytes of a `.torrent` file, hashing the canonical
    /// encoding of its `info` dictionary.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_bytes_with(data, ParseOptions::default())
    }

    pub fn from_bytes_with(data: &[u8], options: ParseOptions) -> Result<Self> {
        let root = bencode::decode(data)?;
        match options.info_hash {
            InfoHashSource::Canonical => Self::parse(&root, None),
            InfoHashSource::Raw => match bencode::dict_value_span(data, b"info")? {
                Some(span) => Self::parse(&root, Some(&data[span])),
                None => Err(Error::missing("info")),
            },
        }
    }

    /// Parses an already decoded top level dictionary. The original bytes are
    /// gone at this point, so the info hash is always the canonical one.
    pub fn from_value(root: &Value) -> Result<Self> {
        Self::parse(root, None)
    }

    fn parse(root: &Value, raw_info: Option<&[u8]>) -> Result<Self> {
        let root = expect_dict(root, "torrent")?;

        let announce = expect_str(required(root, "announce")?, "announce")?;
        Url::parse(announce).map_err(|e| Error::invalid("announce", e.to_string()))?;

        let announce_list = match root.get(&b"announce-list"[..]) {
            Some(tiers) => parse_announce_list(tiers)?,
            None => Vec::new(),
        };

        let info_value = required(root, "info")?;
        let info = expect_dict(info_value, "info")?;
        let info_hash = match raw_info {
            Some(raw) => ShaHash::from_bytes(raw),
            None => ShaHash::from_bytes(&bencode::encode(info_value)),
        };

        let name = expect_str(required(info, "name")?, "name")?;
        check_path_component(name, "name")?;

        let piece_length = expect_int(required(info, "piece length")?, "piece length")?;
        if piece_length <= 0 {
            return Err(Error::invalid(
                "piece length",
                format!("must be positive, got {}", piece_length),
            ));
        }
        let piece_length = piece_length as u64;

        let blob = expect_bytes(required(info, "pieces")?, "pieces")?;
        if blob.len() % SHA_HASH_LEN != 0 {
            return Err(Error::PieceBlobLengthMismatch { length: blob.len() });
        }
        if blob.len() / SHA_HASH_LEN > u32::max_value() as usize {
            return Err(Error::invalid("pieces", "too many pieces"));
        }
        let pieces = blob
            .chunks(SHA_HASH_LEN)
            .map(ShaHash::try_from)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| Error::PieceBlobLengthMismatch { length: blob.len() })?;

        let (files, total_length, multi_file) = match info.get(&b"files"[..]) {
            None => {
                let length = expect_u64(required(info, "length")?, "length")?;
                let file = TorrentFile {
                    index: 0,
                    length,
                    offset: 0,
                    path: PathBuf::from(name),
                };
                (vec![file], length, false)
            }
            Some(files) => {
                let (files, total_length) = parse_files(files)?;
                (files, total_length, true)
            }
        };

        let private = match info.get(&b"private"[..]) {
            Some(value) => expect_int(value, "private")? == 1,
            None => false,
        };

        for (key, _) in root.iter().chain(info.iter()) {
            if !KNOWN_KEYS.iter().any(|known| *known == &key[..]) {
                debug!("skipping unknown field {:?}", String::from_utf8_lossy(key));
            }
        }

        let metadata = Self {
            announce: announce.to_owned(),
            announce_list,
            info_hash,
            name: PathBuf::from(name),
            piece_length,
            pieces,
            files,
            total_length,
            multi_file,
            private,
            comment: optional_text(root, "comment"),
            created_by: optional_text(root, "created by"),
            creation_date: root.get(&b"creation date"[..]).and_then(Value::as_integer),
            encoding: optional_text(root, "encoding"),
        };

        let expected = metadata.expected_piece_count();
        if expected != metadata.pieces.len() as u64 {
            warn!(
                "torrent {} declares {} pieces but its content needs {}",
                metadata.info_hash,
                metadata.pieces.len(),
                expected
            );
        }

        Ok(metadata)
    }

    #[inline]
    pub fn announce(&self) -> &str {
        &self.announce
    }

    #[inline]
    pub fn announce_list(&self) -> &[Vec<String>] {
        &self.announce_list
    }

    #[inline]
    pub fn info_hash(&self) -> &InfoHash {
        &self.info_hash
    }

    #[inline]
    pub fn name(&self) -> &Path {
        &self.name
    }

    #[inline]
    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    #[inline]
    pub fn pieces(&self) -> &[ShaHash] {
        &self.pieces
    }

    #[inline]
    pub fn files(&self) -> &[TorrentFile] {
        &self.files
    }

    #[inline]
    pub fn is_multi_file(&self) -> bool {
        self.multi_file
    }

    #[inline]
    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_ref().map(String::as_str)
    }

    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_ref().map(String::as_str)
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_ref().map(String::as_str)
    }

    /// time of creation based on the epoch second timestamp
    pub fn creation_time(&self) -> Option<DateTime<Utc>> {
        self.creation_date
            .and_then(|seconds| Utc.timestamp_opt(seconds, 0).single())
    }

    /// number of pieces, fits a `u32` by construction
    #[inline]
    pub fn piece_count(&self) -> u32 {
        self.pieces.len() as u32
    }

    /// overall length of the content in bytes
    #[inline]
    pub fn total_length(&self) -> u64 {
        self.total_length
    }

    fn expected_piece_count(&self) -> u64 {
        let total = self.total_length();
        total / self.piece_length + if total % self.piece_length == 0 { 0 } else { 1 }
    }

    /// length of the last piece, `0` for torrents without pieces
    pub fn last_piece_length(&self) -> u64 {
        if self.pieces.is_empty() {
            return 0;
        }
        let before_last = (self.pieces.len() as u64 - 1).saturating_mul(self.piece_length);
        self.total_length()
            .saturating_sub(before_last)
            .min(self.piece_length)
    }

    /// length of the piece at `index`
    pub fn piece_size(&self, index: u32) -> Result<u64> {
        self.check_piece(index)?;
        if index + 1 == self.piece_count() {
            Ok(self.last_piece_length())
        } else {
            Ok(self.piece_length)
        }
    }

    /// the expected SHA-1 hash of piece `index`
    pub fn piece_hash(&self, index: u32) -> Result<&ShaHash> {
        self.check_piece(index)?;
        Ok(&self.pieces[index as usize])
    }

    /// compares the SHA-1 hash of `data` with the expected hash of piece `index`
    pub fn verify_piece(&self, index: u32, data: &[u8]) -> Result<bool> {
        let expected = self.piece_hash(index)?;
        Ok(ShaHash::from_bytes(data) == *expected)
    }

    /// all files the piece at `index` has bytes in, in order
    pub fn files_of_piece(&self, index: u32) -> Result<Vec<&TorrentFile>> {
        let size = self.piece_size(index)?;
        let begin = u64::from(index).saturating_mul(self.piece_length);
        let end = begin.saturating_add(size);
        Ok(self
            .files
            .iter()
            .filter(|file| file.overlaps(begin, end))
            .collect())
    }

    /// an empty bitfield sized for this torrent's pieces
    pub fn new_bitfield(&self) -> Bitfield {
        Bitfield::new(self.piece_count())
    }

    fn check_piece(&self, index: u32) -> Result<()> {
        if index >= self.piece_count() {
            return Err(Error::IndexOutOfRange {
                index: index as u64,
                bound: self.piece_count() as u64,
            });
        }
        Ok(())
    }
}

const KNOWN_KEYS: &[&[u8]] = &[
    b"announce",
    b"announce-list",
    b"comment",
    b"created by",
    b"creation date",
    b"encoding",
    b"info",
    b"name",
    b"piece length",
    b"pieces",
    b"length",
    b"files",
    b"private",
];

fn parse_announce_list(value: &Value) -> Result<Vec<Vec<String>>> {
    let mut tiers = Vec::new();
    for (i, tier) in expect_list(value, "announce-list")?.iter().enumerate() {
        let name = format!("announce-list[{}]", i);
        let urls = expect_list(tier, &name)?
            .iter()
            .map(|url| expect_str(url, &name).map(str::to_owned))
            .collect::<Result<Vec<_>>>()?;
        tiers.push(urls);
    }
    Ok(tiers)
}

/// the entries of `files` and their total length
fn parse_files(value: &Value) -> Result<(Vec<TorrentFile>, u64)> {
    let entries = expect_list(value, "files")?;
    let mut files = Vec::with_capacity(entries.len());
    let mut offset = 0u64;

    for (index, entry) in entries.iter().enumerate() {
        let name = format!("files[{}]", index);
        let entry = expect_dict(entry, &name)?;

        let length_name = format!("{}.length", name);
        let length = match entry.get(&b"length"[..]) {
            Some(length) => expect_u64(length, &length_name)?,
            None => return Err(Error::missing(length_name)),
        };

        let path_name = format!("{}.path", name);
        let components = match entry.get(&b"path"[..]) {
            Some(path) => expect_list(path, &path_name)?,
            None => return Err(Error::missing(path_name)),
        };
        if components.is_empty() {
            return Err(Error::invalid(path_name, "empty path"));
        }
        let mut path = PathBuf::new();
        for component in components {
            let component = expect_str(component, &path_name)?;
            check_path_component(component, &path_name)?;
            path.push(component);
        }

        files.push(TorrentFile {
            index: index as u64,
            length,
            offset,
            path,
        });
        offset = offset
            .checked_add(length)
            .ok_or_else(|| Error::invalid("files", "total length overflows"))?;
    }

    Ok((files, offset))
}

/// rejects components that would escape the download directory
fn check_path_component(component: &str, name: &str) -> Result<()> {
    let invalid = component.is_empty()
        || component == "."
        || component == ".."
        || component.contains(|c| c == '/' || c == '\\' || c == '\0');
    if invalid {
        return Err(Error::invalid(
            name,
            format!("{:?} is not a valid path component", component),
        ));
    }
    Ok(())
}

fn optional_text(dict: &Dictionary, key: &str) -> Option<String> {
    dict.get(key.as_bytes())
        .and_then(Value::as_bytes)
        .map(|b| String::from_utf8_lossy(b).into_owned())
}
