/// Frame counters for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelStats {
    pub frames_sent: u64,
    pub bytes_sent: u64,
    pub frames_received: u64,
    pub bytes_received: u64,
    /// Received frames that were malformed or unexpected in the current state.
    pub frames_dropped: u64,
    /// Sends refused because the frame exceeded the size limit.
    pub oversize_rejected: u64,
}

impl ChannelStats {
    pub(crate) fn record_sent(&mut self, len: usize) {
        self.frames_sent += 1;
        self.bytes_sent += len as u64;
    }

    pub(crate) fn record_received(&mut self, len: usize) {
        self.frames_received += 1;
        self.bytes_received += len as u64;
    }
}
