//! HTTP tracker announces and the per torrent session state they maintain.
//!
//! A [`Tracker`] owns one [`TrackerState`] behind a single lock. Requests are
//! sent and decoded without holding that lock, the state is only touched once
//! a response was fully validated. A failed announce therefore leaves every
//! counter and the peer set as they were and may simply be retried.

use fnv::FnvHashMap;
use parking_lot::Mutex;
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::torrent::TorrentMetadata;
use crate::util::InfoHash;

mod config;
mod peer;
mod request;
mod response;

pub use self::config::{PeerMergePolicy, TrackerConfig, DEFAULT_PORT};
pub use self::peer::{Peer, PeerId, COMPACT_PEER_LEN, PEER_ID_LEN};
pub use self::request::{AnnounceEvent, AnnounceRequest, AnnounceRequestBuilder};
pub use self::response::{parse_compact_peers, parse_peers, AnnounceResponse};

/// Session state of a single torrent towards its tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
    pub info_hash: InfoHash,
    pub peer_id: PeerId,
    pub uploaded: u64,
    pub downloaded: u64,
    /// bytes still missing
    pub left: u64,
    /// a `started` announce went through and no `stopped` since
    pub started: bool,
    /// a `completed` announce went through
    pub completed: bool,
    pub interval: Duration,
    pub min_interval: Option<Duration>,
    pub tracker_id: Option<String>,
    pub seeders: u64,
    pub leechers: u64,
    /// known peers keyed by their ip address
    pub peers: FnvHashMap<String, Peer>,
}

impl TrackerState {
    fn new(info_hash: InfoHash, peer_id: PeerId, left: u64, interval: Duration) -> Self {
        Self {
            info_hash,
            peer_id,
            uploaded: 0,
            downloaded: 0,
            left,
            started: false,
            completed: false,
            interval,
            min_interval: None,
            tracker_id: None,
            seeders: 0,
            leechers: 0,
            peers: FnvHashMap::default(),
        }
    }
}

/// Announce client of a single torrent.
pub struct Tracker {
    announce: Url,
    config: TrackerConfig,
    client: Client,
    state: Mutex<TrackerState>,
    /// set while a `completed` announce is in flight
    completing: AtomicBool,
}

impl Tracker {
    /// Only `http` and `https` announce urls are accepted.
    pub fn new(
        announce: &str,
        info_hash: InfoHash,
        peer_id: PeerId,
        left: u64,
        config: TrackerConfig,
    ) -> Result<Self> {
        let announce =
            Url::parse(announce).map_err(|err| Error::invalid("announce", err.to_string()))?;
        match announce.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(Error::invalid(
                    "announce",
                    format!("unsupported tracker scheme `{}`", scheme),
                ))
            }
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            announce,
            state: Mutex::new(TrackerState::new(
                info_hash,
                peer_id,
                left,
                config.default_interval,
            )),
            config,
            client,
            completing: AtomicBool::new(false),
        })
    }

    /// A tracker for the primary announce url of `metadata` with the whole
    /// content still to download.
    pub fn from_metadata(
        metadata: &TorrentMetadata,
        peer_id: PeerId,
        config: TrackerConfig,
    ) -> Result<Self> {
        Self::new(
            metadata.announce(),
            *metadata.info_hash(),
            peer_id,
            metadata.total_length(),
            config,
        )
    }

    #[inline]
    pub fn announce_url(&self) -> &Url {
        &self.announce
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Announces `started` the first time and a regular announce afterwards.
    pub fn announce(&self) -> Result<Vec<Peer>> {
        let event = if self.state.lock().started {
            AnnounceEvent::Regular
        } else {
            AnnounceEvent::Started
        };
        self.send_request(event)
    }

    /// Tells the tracker the download finished. Fails with
    /// [`Error::AlreadyCompleted`] if that was already done.
    pub fn send_completed(&self) -> Result<Vec<Peer>> {
        self.send_request(AnnounceEvent::Completed)
    }

    pub fn send_stopped(&self) -> Result<Vec<Peer>> {
        self.send_request(AnnounceEvent::Stopped)
    }

    /// Sends one announce and merges the response into the state, returns the
    /// peers of this response.
    ///
    /// Blocks for at most the connect plus the read timeout.
    pub fn send_request(&self, event: AnnounceEvent) -> Result<Vec<Peer>> {
        let _completing = match event {
            AnnounceEvent::Completed => Some(self.begin_completed()?),
            _ => None,
        };

        let url = self.request(event)?.to_url(&self.announce);
        debug!("Announcing {} to {}", event, url);

        let response = self.client.get(url).send()?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().unwrap_or_default();
            let message = match status.canonical_reason() {
                Some(reason) if body.trim().is_empty() => reason.to_owned(),
                Some(reason) => format!("{}: {}", reason, body.trim()),
                None => body.trim().to_owned(),
            };
            warn!("Tracker {} rejected announce: {} {}", self.announce, status, message);
            return Err(Error::TrackerHttp {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes()?;
        self.apply(event, &body)
    }

    /// Merges an already received announce response body into the state.
    pub fn update_from_response(&self, body: &[u8]) -> Result<Vec<Peer>> {
        self.apply(AnnounceEvent::Regular, body)
    }

    /// The request the next announce with `event` sends.
    pub fn request(&self, event: AnnounceEvent) -> Result<AnnounceRequest> {
        let state = self.state.lock();
        let mut builder = AnnounceRequest::builder()
            .info_hash(state.info_hash)
            .peer_id(state.peer_id)
            .port(self.config.port)
            .uploaded(state.uploaded)
            .downloaded(state.downloaded)
            .left(state.left)
            .compact(self.config.compact)
            .event(event);
        if let Some(numwant) = self.config.numwant {
            builder = builder.numwant(numwant);
        }
        if let Some(tracker_id) = &state.tracker_id {
            builder = builder.tracker_id(tracker_id.as_str());
        }
        builder
            .build()
            .map_err(|reason| Error::invalid("request", reason))
    }

    pub fn record_uploaded(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.uploaded = state.uploaded.saturating_add(bytes);
    }

    /// Adds to the downloaded bytes, `left` shrinks by as much.
    pub fn record_downloaded(&self, bytes: u64) {
        let mut state = self.state.lock();
        state.downloaded = state.downloaded.saturating_add(bytes);
        state.left = state.left.saturating_sub(bytes);
    }

    pub fn set_left(&self, left: u64) {
        self.state.lock().left = left;
    }

    /// A consistent copy of the current state.
    pub fn snapshot(&self) -> TrackerState {
        self.state.lock().clone()
    }

    /// every known peer
    pub fn peers(&self) -> Vec<Peer> {
        self.state.lock().peers.values().copied().collect()
    }

    /// seconds to wait until the next regular announce
    pub fn interval(&self) -> Duration {
        self.state.lock().interval
    }

    fn begin_completed(&self) -> Result<CompletingGuard> {
        let already = self.state.lock().completed || self.completing.swap(true, Ordering::SeqCst);
        if already {
            let info_hash = self.state.lock().info_hash;
            return Err(Error::AlreadyCompleted { info_hash });
        }
        Ok(CompletingGuard(&self.completing))
    }

    fn apply(&self, event: AnnounceEvent, body: &[u8]) -> Result<Vec<Peer>> {
        let (interval, min_interval, tracker_id, complete, incomplete, warning, peers) =
            match AnnounceResponse::from_bytes(body)? {
                AnnounceResponse::Failure { reason } => {
                    warn!("Tracker {} refused announce: {}", self.announce, reason);
                    return Err(Error::TrackerFailure { message: reason });
                }
                AnnounceResponse::Success {
                    interval,
                    min_interval,
                    tracker_id,
                    complete,
                    incomplete,
                    warning,
                    peers,
                } => (
                    interval,
                    min_interval,
                    tracker_id,
                    complete,
                    incomplete,
                    warning,
                    peers,
                ),
            };
        if let Some(warning) = warning {
            warn!("Tracker {} warns: {}", self.announce, warning);
        }

        let mut state = self.state.lock();
        state.interval = Duration::from_secs(interval);
        if let Some(min_interval) = min_interval {
            state.min_interval = Some(Duration::from_secs(min_interval));
        }
        if let Some(tracker_id) = tracker_id {
            state.tracker_id = Some(tracker_id);
        }
        if let Some(complete) = complete {
            state.seeders = complete;
        }
        if let Some(incomplete) = incomplete {
            state.leechers = incomplete;
        }

        for peer in &peers {
            let key = peer.ip.to_string();
            match self.config.merge_policy {
                PeerMergePolicy::KeepExisting => {
                    state.peers.entry(key).or_insert(*peer);
                }
                PeerMergePolicy::Replace => {
                    state.peers.insert(key, *peer);
                }
            }
        }

        match event {
            AnnounceEvent::Started => state.started = true,
            AnnounceEvent::Stopped => state.started = false,
            AnnounceEvent::Completed => state.completed = true,
            AnnounceEvent::Regular => {}
        }

        info!(
            "Tracker {} returned {} peers for {}, {} known, {} seeders, {} leechers",
            self.announce,
            peers.len(),
            state.info_hash,
            state.peers.len(),
            state.seeders,
            state.leechers
        );
        Ok(peers)
    }
}

/// Clears the in flight `completed` flag once the announce returned.
struct CompletingGuard<'a>(&'a AtomicBool);

impl<'a> Drop for CompletingGuard<'a> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
