//! # Time-Series Buffers
//!
//! Bounded, time-windowed history of each charted signal.
//!
//! One buffer exists per tracked channel (altitude, AGL, vertical velocity,
//! and the three acceleration axes). Buffers are append-only from the
//! ingestion path and evicted from the front as points age out of the
//! sliding window; the render side only ever receives owned copies.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};

use super::snapshot::Snapshot;

/// Default sliding window: matches the ten seconds of history the live
/// charts scroll through.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(10);

/// One charted signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Altitude,
    Agl,
    Velocity,
    AccelX,
    AccelY,
    AccelZ,
}

impl Channel {
    /// Every tracked channel, in display order
    pub const ALL: [Channel; 6] = [
        Channel::Altitude,
        Channel::Agl,
        Channel::Velocity,
        Channel::AccelX,
        Channel::AccelY,
        Channel::AccelZ,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Altitude => "altitude",
            Channel::Agl => "agl",
            Channel::Velocity => "velocity",
            Channel::AccelX => "acceleration_x",
            Channel::AccelY => "acceleration_y",
            Channel::AccelZ => "acceleration_z",
        }
    }

    fn index(self) -> usize {
        match self {
            Channel::Altitude => 0,
            Channel::Agl => 1,
            Channel::Velocity => 2,
            Channel::AccelX => 3,
            Channel::AccelY => 4,
            Channel::AccelZ => 5,
        }
    }

    /// Value this channel tracks, pulled from an accepted snapshot
    fn sample(self, snapshot: &Snapshot) -> f64 {
        match self {
            Channel::Altitude => snapshot.position.gps_altitude,
            Channel::Agl => snapshot.altitude.agl,
            Channel::Velocity => snapshot.altitude.vertical_velocity,
            Channel::AccelX => snapshot.attitude.accel_x,
            Channel::AccelY => snapshot.attitude.accel_y,
            Channel::AccelZ => snapshot.attitude.accel_z,
        }
    }
}

/// One timestamped sample of a charted signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub at: DateTime<Utc>,
    pub value: f64,
}

/// Bounded, time-ordered window of one signal's history.
///
/// Points are appended as received: an out-of-order timestamp is kept rather
/// than reordered or dropped, and chart consumers are expected to render the
/// discontinuity instead of failing.
#[derive(Debug)]
pub struct SeriesBuffer {
    window: chrono::Duration,
    points: VecDeque<SeriesPoint>,
}

impl SeriesBuffer {
    pub fn new(window: Duration) -> Self {
        Self {
            window: chrono::Duration::from_std(window)
                .unwrap_or_else(|_| chrono::Duration::seconds(10)),
            points: VecDeque::new(),
        }
    }

    /// Append a point at the tail and age out anything older than the
    /// window, measured from the appended timestamp. Eviction from the
    /// front on every append keeps the buffer bounded at O(1) amortized
    /// cost per message.
    pub fn append(&mut self, at: DateTime<Utc>, value: f64) {
        self.points.push_back(SeriesPoint { at, value });
        self.evict_older_than(at - self.window);
    }

    /// Drop leading points with a timestamp before `cutoff`
    pub fn evict_older_than(&mut self, cutoff: DateTime<Utc>) {
        while let Some(front) = self.points.front() {
            if front.at < cutoff {
                self.points.pop_front();
            } else {
                break;
            }
        }
    }

    /// Owned copy of the buffered points, oldest first. The caller may do
    /// anything with the copy; the buffer itself stays untouched.
    pub fn snapshot(&self) -> Vec<SeriesPoint> {
        self.points.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Shared handle to the full set of per-channel buffers.
///
/// The ingestion task is the only writer; display code reads through
/// [`SeriesSet::view`], which hands out copies. Each channel's buffer is
/// independent of the others.
#[derive(Debug, Clone)]
pub struct SeriesSet {
    inner: Arc<RwLock<[SeriesBuffer; 6]>>,
}

impl SeriesSet {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new([
                SeriesBuffer::new(window),
                SeriesBuffer::new(window),
                SeriesBuffer::new(window),
                SeriesBuffer::new(window),
                SeriesBuffer::new(window),
                SeriesBuffer::new(window),
            ])),
        }
    }

    /// Append one point per channel from an accepted snapshot, stamped with
    /// the snapshot's capture time.
    pub fn ingest(&self, snapshot: &Snapshot) {
        let mut buffers = self.inner.write().expect("series buffers lock poisoned");
        for channel in Channel::ALL {
            buffers[channel.index()].append(snapshot.received_at, channel.sample(snapshot));
        }
    }

    /// Read-only copy of one channel's buffered history, oldest first
    pub fn view(&self, channel: Channel) -> Vec<SeriesPoint> {
        let buffers = self.inner.read().expect("series buffers lock poisoned");
        buffers[channel.index()].snapshot()
    }

    /// Number of points currently buffered for a channel
    pub fn depth(&self, channel: Channel) -> usize {
        let buffers = self.inner.read().expect("series buffers lock poisoned");
        buffers[channel.index()].len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::snapshot::GeoPoint;
    use chrono::TimeZone;

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
    }

    #[test]
    fn test_append_and_snapshot_preserve_order() {
        let mut buffer = SeriesBuffer::new(DEFAULT_WINDOW);
        buffer.append(t(0), 10.0);
        buffer.append(t(1), 20.0);
        buffer.append(t(2), 30.0);

        let points = buffer.snapshot();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].value, 10.0);
        assert_eq!(points[1].value, 20.0);
        assert_eq!(points[2].value, 30.0);
    }

    #[test]
    fn test_points_age_out_of_the_window() {
        let mut buffer = SeriesBuffer::new(Duration::from_secs(10));

        for i in 0..30 {
            buffer.append(t(i), i as f64);
        }

        // 30 seconds of appends against a 10 second window
        let points = buffer.snapshot();
        assert!(points.len() <= 11);

        let cutoff = t(29) - chrono::Duration::seconds(10);
        assert!(points.iter().all(|p| p.at >= cutoff));

        // Survivors keep their original order
        for pair in points.windows(2) {
            assert!(pair[0].at <= pair[1].at);
        }
        assert_eq!(points.last().unwrap().value, 29.0);
    }

    #[test]
    fn test_out_of_order_append_is_kept() {
        let mut buffer = SeriesBuffer::new(DEFAULT_WINDOW);
        buffer.append(t(5), 1.0);
        buffer.append(t(3), 2.0);

        // Appended as received, not reordered
        let points = buffer.snapshot();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].at, t(5));
        assert_eq!(points[1].at, t(3));
    }

    #[test]
    fn test_evict_older_than_only_trims_the_front() {
        let mut buffer = SeriesBuffer::new(Duration::from_secs(60));
        buffer.append(t(0), 1.0);
        buffer.append(t(10), 2.0);
        buffer.append(t(20), 3.0);

        buffer.evict_older_than(t(10));

        let points = buffer.snapshot();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].at, t(10));
    }

    #[test]
    fn test_snapshot_copy_does_not_mutate_buffer() {
        let mut buffer = SeriesBuffer::new(DEFAULT_WINDOW);
        buffer.append(t(0), 1.0);

        let mut copy = buffer.snapshot();
        copy.clear();

        assert_eq!(buffer.len(), 1);
    }

    fn sample_snapshot(at: DateTime<Utc>) -> Snapshot {
        let mut snapshot = Snapshot::initial(GeoPoint {
            latitude: -1.1,
            longitude: 37.01,
        });
        snapshot.position.gps_altitude = 100.0;
        snapshot.altitude.agl = 95.0;
        snapshot.altitude.vertical_velocity = 2.0;
        snapshot.attitude.accel_x = 1.0;
        snapshot.attitude.accel_y = 0.0;
        snapshot.attitude.accel_z = 9.8;
        snapshot.received_at = at;
        snapshot
    }

    #[test]
    fn test_ingest_fans_out_to_every_channel() {
        let series = SeriesSet::new(DEFAULT_WINDOW);
        let at = t(0);

        series.ingest(&sample_snapshot(at));

        for channel in Channel::ALL {
            assert_eq!(series.depth(channel), 1, "channel {}", channel.as_str());
        }

        let altitude = series.view(Channel::Altitude);
        assert_eq!(altitude[0].at, at);
        assert_eq!(altitude[0].value, 100.0);

        let agl = series.view(Channel::Agl);
        assert_eq!(agl[0].value, 95.0);

        assert_eq!(series.view(Channel::Velocity)[0].value, 2.0);
        assert_eq!(series.view(Channel::AccelX)[0].value, 1.0);
        assert_eq!(series.view(Channel::AccelY)[0].value, 0.0);
        assert_eq!(series.view(Channel::AccelZ)[0].value, 9.8);
    }

    #[test]
    fn test_channels_are_independent() {
        let series = SeriesSet::new(DEFAULT_WINDOW);
        series.ingest(&sample_snapshot(t(0)));
        series.ingest(&sample_snapshot(t(1)));

        let mut altitude = series.view(Channel::Altitude);
        altitude.clear();

        // Mutating one view changes nothing shared
        assert_eq!(series.depth(Channel::Altitude), 2);
        assert_eq!(series.depth(Channel::Velocity), 2);
    }

    #[test]
    fn test_clones_share_buffers() {
        let series = SeriesSet::new(DEFAULT_WINDOW);
        let reader = series.clone();

        series.ingest(&sample_snapshot(t(0)));

        assert_eq!(reader.depth(Channel::Altitude), 1);
    }
}
