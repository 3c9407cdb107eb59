use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;
use std::fmt;

use crate::tracker::peer::PeerId;
use crate::util::InfoHash;

/// Everything but the RFC 3986 unreserved characters is escaped.
const QUERY_BYTES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceEvent {
    /// regular re-announce, sent without an `event` parameter
    Regular,
    /// the first announce of a download
    Started,
    /// the download finished, at most once per torrent
    Completed,
    /// the client is shutting the torrent down
    Stopped,
}

impl AnnounceEvent {
    /// value of the `event` query parameter
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            AnnounceEvent::Regular => None,
            AnnounceEvent::Started => Some("started"),
            AnnounceEvent::Completed => Some("completed"),
            AnnounceEvent::Stopped => Some("stopped"),
        }
    }
}

impl Default for AnnounceEvent {
    fn default() -> Self {
        AnnounceEvent::Regular
    }
}

impl fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("regular"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnounceRequest {
    /// The 20 byte sha1 hash of the bencoded form of the info value from the
    /// metainfo file.
    pub info_hash: InfoHash,
    /// A string of length 20 which this downloader uses as its id.
    pub peer_id: PeerId,
    /// The port this peer is listening on.
    pub port: u16,
    /// The total amount uploaded so far.
    pub uploaded: u64,
    /// The total amount downloaded so far.
    pub downloaded: u64,
    /// The number of bytes this peer still has to download
    pub left: u64,
    pub compact: bool,
    pub numwant: Option<u32>,
    /// echoed back if a previous response contained one
    pub tracker_id: Option<String>,
    /// An announcement using started is sent when a download first begins, and
    /// one using completed is sent when the download is complete. No completed
    /// is sent if the file was complete when started. Downloaders send an
    /// announcement using stopped when they cease downloading.
    pub event: AnnounceEvent,
}

#[derive(Debug, Default)]
pub struct AnnounceRequestBuilder {
    info_hash: Option<InfoHash>,
    peer_id: Option<PeerId>,
    port: Option<u16>,
    uploaded: Option<u64>,
    downloaded: Option<u64>,
    left: Option<u64>,
    compact: Option<bool>,
    numwant: Option<u32>,
    tracker_id: Option<String>,
    event: Option<AnnounceEvent>,
}

impl AnnounceRequest {
    pub fn builder() -> AnnounceRequestBuilder {
        AnnounceRequestBuilder::default()
    }

    /// The query string, `info_hash` and `peer_id` percent encoded byte by
    /// byte.
    pub fn query(&self) -> String {
        let mut query = format!(
            "info_hash={}&peer_id={}&port={}&uploaded={}&downloaded={}&left={}&compact={}",
            percent_encode(self.info_hash.as_ref(), QUERY_BYTES),
            percent_encode(self.peer_id.as_ref(), QUERY_BYTES),
            self.port,
            self.uploaded,
            self.downloaded,
            self.left,
            if self.compact { 1 } else { 0 }
        );
        if let Some(numwant) = self.numwant {
            query.push_str(&format!("&numwant={}", numwant));
        }
        if let Some(tracker_id) = &self.tracker_id {
            query.push_str("&trackerid=");
            query.push_str(&percent_encode(tracker_id.as_bytes(), QUERY_BYTES).to_string());
        }
        if let Some(event) = self.event.as_str() {
            query.push_str("&event=");
            query.push_str(event);
        }
        query
    }

    /// `announce` with the request's parameters appended to any query it
    /// already carries.
    pub fn to_url(&self, announce: &Url) -> Url {
        let query = match announce.query() {
            Some(existing) if !existing.is_empty() => format!("{}&{}", existing, self.query()),
            _ => self.query(),
        };
        let mut url = announce.clone();
        url.set_query(Some(&query));
        url
    }
}

impl AnnounceRequestBuilder {
    pub fn info_hash<T: Into<InfoHash>>(mut self, info_hash: T) -> Self {
        self.info_hash = Some(info_hash.into());
        self
    }

    pub fn peer_id<T: Into<PeerId>>(mut self, peer_id: T) -> Self {
        self.peer_id = Some(peer_id.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn uploaded(mut self, uploaded: u64) -> Self {
        self.uploaded = Some(uploaded);
        self
    }

    pub fn downloaded(mut self, downloaded: u64) -> Self {
        self.downloaded = Some(downloaded);
        self
    }

    pub fn left(mut self, left: u64) -> Self {
        self.left = Some(left);
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = Some(compact);
        self
    }

    pub fn numwant(mut self, numwant: u32) -> Self {
        self.numwant = Some(numwant);
        self
    }

    pub fn tracker_id<T: Into<String>>(mut self, tracker_id: T) -> Self {
        self.tracker_id = Some(tracker_id.into());
        self
    }

    pub fn event(mut self, event: AnnounceEvent) -> Self {
        self.event = Some(event);
        self
    }

    pub fn build(self) -> Result<AnnounceRequest, String> {
        Ok(AnnounceRequest {
            info_hash: self
                .info_hash
                .ok_or_else(|| "info_hash must be initialized.")?,
            peer_id: self
                .peer_id
                .ok_or_else(|| "peer_id must be initialized.")?,
            port: self.port.ok_or_else(|| "port must be initialized.")?,
            uploaded: self.uploaded.unwrap_or(0),
            downloaded: self.downloaded.unwrap_or(0),
            left: self.left.ok_or_else(|| "left must be initialized.")?,
            compact: self.compact.unwrap_or(true),
            numwant: self.numwant,
            tracker_id: self.tracker_id,
            event: self.event.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(event: AnnounceEvent) -> AnnounceRequest {
        AnnounceRequest::builder()
            .info_hash([0xabu8; 20])
            .peer_id(*b"-TC0001-abcdefghijkl")
            .port(6881)
            .uploaded(1)
            .downloaded(2)
            .left(3)
            .event(event)
            .build()
            .unwrap()
    }

    #[test]
    fn query_carries_raw_bytes_percent_encoded() {
        let query = request(AnnounceEvent::Started).query();
        assert_eq!(
            query,
            format!(
                "info_hash={}&peer_id=-TC0001-abcdefghijkl&port=6881&uploaded=1&downloaded=2&left=3&compact=1&event=started",
                "%AB".repeat(20)
            )
        );
    }

    #[test]
    fn regular_announce_has_no_event() {
        let query = request(AnnounceEvent::Regular).query();
        assert!(!query.contains("event="));
        assert!(request(AnnounceEvent::Stopped)
            .query()
            .ends_with("&event=stopped"));
        assert!(request(AnnounceEvent::Completed)
            .query()
            .ends_with("&event=completed"));
    }

    #[test]
    fn optional_parameters() {
        let mut req = request(AnnounceEvent::Regular);
        req.numwant = Some(50);
        req.tracker_id = Some("id 1".to_owned());
        req.compact = false;
        let query = req.query();
        assert!(query.contains("&compact=0"));
        assert!(query.contains("&numwant=50"));
        assert!(query.contains("&trackerid=id%201"));
    }

    #[test]
    fn url_keeps_existing_query() {
        let req = request(AnnounceEvent::Regular);
        let announce = Url::parse("http://tracker.example.org/announce?passkey=abc").unwrap();
        let url = req.to_url(&announce);
        assert!(url.as_str().starts_with(
            "http://tracker.example.org/announce?passkey=abc&info_hash=%AB%AB"
        ));

        let plain = Url::parse("http://tracker.example.org/announce").unwrap();
        assert_eq!(plain.path(), req.to_url(&plain).path());
        assert_eq!(req.to_url(&plain).query(), Some(req.query().as_str()));
    }

    #[test]
    fn builder_requires_identity() {
        assert!(AnnounceRequest::builder().left(1).port(1).build().is_err());
        assert!(AnnounceRequest::builder()
            .info_hash([0u8; 20])
            .peer_id([0u8; 20])
            .port(1)
            .build()
            .is_err());
    }
}
