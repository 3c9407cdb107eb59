use std::time::Duration;

/// Default port announced to the tracker.
pub const DEFAULT_PORT: u16 = 6881;

/// How peers of a new announce response are merged into the known ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerMergePolicy {
    /// A known ip keeps the port it was first seen with.
    KeepExisting,
    /// A known ip takes the port of the latest response.
    Replace,
}

impl Default for PeerMergePolicy {
    fn default() -> Self {
        PeerMergePolicy::KeepExisting
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// port this client listens on
    pub port: u16,
    pub connect_timeout: Duration,
    /// Added to `connect_timeout` to bound the whole request, not an
    /// inactivity timeout between reads.
    pub read_timeout: Duration,
    /// ask for the compact peer list
    pub compact: bool,
    /// number of peers to ask for, tracker default if `None`
    pub numwant: Option<u32>,
    /// re-announce interval until the tracker tells otherwise
    pub default_interval: Duration,
    pub merge_policy: PeerMergePolicy,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_millis(5000),
            read_timeout: Duration::from_millis(5000),
            compact: true,
            numwant: None,
            default_interval: Duration::from_secs(10),
            merge_policy: PeerMergePolicy::default(),
        }
    }
}

impl TrackerConfig {
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// see [`TrackerConfig::read_timeout`](#structfield.read_timeout)
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    pub fn numwant(mut self, numwant: u32) -> Self {
        self.numwant = Some(numwant);
        self
    }

    pub fn default_interval(mut self, interval: Duration) -> Self {
        self.default_interval = interval;
        self
    }

    pub fn merge_policy(mut self, policy: PeerMergePolicy) -> Self {
        self.merge_policy = policy;
        self
    }

    /// upper bound a single announce may block for
    #[inline]
    pub fn request_timeout(&self) -> Duration {
        self.connect_timeout + self.read_timeout
    }
}
