//! Metadata and tracker foundation of a BitTorrent client.
//!
//! * [`bencode`]: the codec shared by `.torrent` files and tracker responses.
//! * [`torrent`]: validated metainfo and its info hash.
//! * [`tracker`]: HTTP announces and the session state they maintain.
//! * [`bitfield`]: which pieces are owned, safe to share between threads.

#[macro_use]
extern crate log;

pub mod bencode;
pub mod bitfield;
pub mod error;
pub mod torrent;
pub mod tracker;
pub mod util;

pub use crate::bitfield::Bitfield;
pub use crate::error::{Error, Result};
pub use crate::torrent::{InfoHashSource, ParseOptions, TorrentFile, TorrentMetadata};
pub use crate::tracker::{AnnounceEvent, Peer, PeerId, Tracker, TrackerConfig, TrackerState};
pub use crate::util::{InfoHash, ShaHash};
