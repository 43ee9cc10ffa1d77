//! The append-only history cache and its drain bookkeeping.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tracing::debug;
use wslink_ws28xx_protocol::history::{HistoryFrame, HistoryIndex, HistoryRecord};

/// Two frames for the same slot inside this window are one console
/// retransmission, not two records.
const DUPLICATE_WINDOW: Duration = Duration::from_secs(3);

/// Content-addressed cache of archive records, keyed by timestamp and ring
/// slot so delivery order is strictly increasing in time.
#[derive(Debug, Default)]
pub struct HistoryCache {
    records: BTreeMap<(NaiveDateTime, u16), HistoryRecord>,
    caching: bool,
    since: Option<NaiveDateTime>,
    target_count: Option<usize>,
    scanned: u64,
    next_index: HistoryIndex,
    latest_index: HistoryIndex,
    last_slot: Option<(HistoryIndex, Instant)>,
}

impl HistoryCache {
    /// Fresh cache; nothing is appended until caching starts.
    pub fn new() -> Self {
        HistoryCache {
            next_index: HistoryIndex::UNKNOWN,
            latest_index: HistoryIndex::UNKNOWN,
            ..HistoryCache::default()
        }
    }

    /// Enable appending. `since` drops older records; `target_count`
    /// stops the drain once that many records are cached.
    pub fn start(&mut self, since: Option<NaiveDateTime>, target_count: Option<usize>) {
        self.caching = true;
        self.since = since;
        self.target_count = target_count;
        self.scanned = 0;
    }

    /// Disable appending; cached records stay available.
    pub fn stop(&mut self) {
        self.caching = false;
    }

    /// Whether records are still being collected.
    pub fn is_caching(&self) -> bool {
        self.caching
    }

    /// Drop every cached record.
    pub fn clear(&mut self) {
        self.records.clear();
        self.scanned = 0;
    }

    /// Records in strictly increasing timestamp order.
    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.values().cloned().collect()
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// History frames inspected since caching started.
    pub fn num_scanned(&self) -> u64 {
        self.scanned
    }

    /// Records still outstanding on the console.
    pub fn uncached_count(&self) -> u16 {
        self.next_index.outstanding_until(self.latest_index)
    }

    /// The slot the drain will request next.
    pub fn next_index(&self) -> HistoryIndex {
        self.next_index
    }

    /// The newest slot the console has reported.
    pub fn latest_index(&self) -> HistoryIndex {
        self.latest_index
    }

    /// Whether the drain still has records to pull.
    pub fn catchup_pending(&self) -> bool {
        self.caching
            && (self.next_index == HistoryIndex::UNKNOWN || self.uncached_count() > 0)
    }

    /// Fold one received history frame into the cache. Returns `true` when
    /// the record was appended (not a duplicate, not filtered).
    pub fn observe(&mut self, frame: &HistoryFrame, now: Instant) -> bool {
        self.latest_index = frame.latest_index;

        // Retransmission of the slot we just saw.
        if let Some((slot, at)) = self.last_slot {
            if slot == frame.this_index && now.duration_since(at) < DUPLICATE_WINDOW {
                debug!(slot = slot.0, "duplicate history frame dropped");
                return false;
            }
        }
        self.last_slot = Some((frame.this_index, now));

        if frame.this_index.is_valid() {
            self.next_index = if frame.this_index == frame.latest_index {
                frame.latest_index
            } else {
                frame.this_index.next()
            };
        }

        if !self.caching {
            return false;
        }
        self.scanned += 1;

        if let Some(since) = self.since {
            if frame.record.time < since {
                return false;
            }
        }
        if let Some(target) = self.target_count {
            if self.records.len() >= target {
                self.caching = false;
                return false;
            }
        }

        let key = (frame.record.time, frame.this_index.0);
        let appended = self
            .records
            .insert(key, frame.record.clone())
            .is_none();
        if appended && self.target_count == Some(self.records.len()) {
            self.caching = false;
        }
        appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wslink_ws28xx_protocol::frame::FrameHeader;
    use wslink_ws28xx_protocol::values::{BatteryFlags, Reading, WindDirection};
    use wslink_ws28xx_protocol::{DeviceId, ResponseType};

    fn record(minute: u32) -> HistoryRecord {
        HistoryRecord {
            time: NaiveDate::from_ymd_opt(2013, 6, 24)
                .and_then(|d| d.and_hms_opt(9, minute, 0))
                .expect("valid date"),
            temp_indoor: Reading::Value(23.5),
            temp_outdoor: Reading::Value(13.7),
            humidity_indoor: Reading::Value(59.0),
            humidity_outdoor: Reading::Value(86.0),
            pressure: Reading::Value(1019.2),
            rain_counter: Reading::Value(0.0),
            wind_direction: WindDirection(7),
            wind_speed: Reading::Value(1.0),
            gust: Reading::Value(1.2),
        }
    }

    fn frame(minute: u32, this: u16, latest: u16) -> HistoryFrame {
        HistoryFrame {
            header: FrameHeader {
                device_id: DeviceId(0x012e),
                response: ResponseType::History,
                battery: BatteryFlags(0),
                quality: 80,
                config_checksum: 0x051b,
            },
            latest_index: HistoryIndex(latest),
            this_index: HistoryIndex(this),
            record: record(minute),
        }
    }

    #[test]
    fn test_records_delivered_in_time_order() {
        let mut cache = HistoryCache::new();
        cache.start(None, None);
        let now = Instant::now();
        // Arrival order scrambled; keys sort by timestamp.
        for (minute, slot) in [(30u32, 3u16), (10, 1), (20, 2)] {
            cache.observe(&frame(minute, slot, 5), now + Duration::from_secs(u64::from(slot) * 4));
        }
        let times: Vec<u32> = cache
            .records()
            .iter()
            .map(|r| {
                use chrono::Timelike;
                r.time.minute()
            })
            .collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[test]
    fn test_duplicate_slot_within_window_dropped() {
        let mut cache = HistoryCache::new();
        cache.start(None, None);
        let now = Instant::now();
        assert!(cache.observe(&frame(10, 1, 5), now));
        assert!(!cache.observe(&frame(10, 1, 5), now + Duration::from_secs(1)));
        assert_eq!(cache.len(), 1);
        // Outside the window the same slot is a fresh record.
        assert!(!cache
            .observe(&frame(10, 1, 5), now + Duration::from_secs(5)));
        // Same key, so still one record; but it was scanned.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_target_count_stops_caching() {
        let mut cache = HistoryCache::new();
        cache.start(None, Some(2));
        let now = Instant::now();
        cache.observe(&frame(10, 1, 5), now);
        cache.observe(&frame(20, 2, 5), now + Duration::from_secs(4));
        assert_eq!(cache.len(), 2);
        assert!(!cache.is_caching());
        cache.observe(&frame(30, 3, 5), now + Duration::from_secs(8));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_since_filter() {
        let mut cache = HistoryCache::new();
        let cutoff = NaiveDate::from_ymd_opt(2013, 6, 24)
            .and_then(|d| d.and_hms_opt(9, 15, 0))
            .expect("valid date");
        cache.start(Some(cutoff), None);
        let now = Instant::now();
        cache.observe(&frame(10, 1, 5), now);
        cache.observe(&frame(20, 2, 5), now + Duration::from_secs(4));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.num_scanned(), 2);
    }

    #[test]
    fn test_drain_progress() {
        let mut cache = HistoryCache::new();
        cache.start(None, None);
        assert!(cache.catchup_pending());
        let now = Instant::now();
        cache.observe(&frame(10, 3, 5), now);
        assert_eq!(cache.next_index(), HistoryIndex(4));
        assert_eq!(cache.latest_index(), HistoryIndex(5));
        assert_eq!(cache.uncached_count(), 1);
        assert!(cache.catchup_pending());

        cache.observe(&frame(20, 5, 5), now + Duration::from_secs(4));
        assert_eq!(cache.uncached_count(), 0);
        assert!(!cache.catchup_pending());
    }
}
