//! Drives a frame stream through the accumulator and cuts it into windows.
//!
//! A window opens at the timestamp of its first frame `s` and keeps taking
//! frames while `t - s <= period`. The first frame past that closes it; every
//! whole period skipped after the closed window is emitted as an empty
//! snapshot, then a new window opens at the frame's own timestamp. The last
//! window is flushed when the input runs dry, unless it never saw a frame.

use std::convert::Infallible;
use std::iter::Map;

use tracing::{debug, warn};

use crate::classify::Classify;
use crate::config::Period;
use crate::counter::{Snapshot, WindowCount};
use crate::error::{Error, FrameIssue, Result};

/// Lazy sequence of window snapshots over a (possibly fallible) frame source.
///
/// Source errors are passed through unchanged. Frames with a bad timestamp
/// are reported as [`Error::InvalidFrame`] and leave the windows untouched.
pub struct Windows<I> {
    frames: I,
    period: f64,
    window: Option<WindowCount>,
    /// The window closed by the last frame, not handed out yet.
    closed: Option<Snapshot>,
    gap: Option<Gap>,
    index: usize,
    last_ts: Option<f64>,
    exhausted: bool,
}

impl<I> Windows<I> {
    pub fn new(frames: I, period: Period) -> Self {
        Windows {
            frames,
            period: period.as_secs(),
            window: None,
            closed: None,
            gap: None,
            index: 0,
            last_ts: None,
            exhausted: false,
        }
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// The window being filled, if any frame opened one.
    pub fn pending(&self) -> Option<&WindowCount> {
        self.window.as_ref()
    }

    /// Stops the driver without flushing the partial window.
    pub fn discard(self) -> Option<WindowCount> {
        self.window
    }

    /// Empty windows still to be handed out before the next frame is pulled.
    pub fn queued_gaps(&self) -> u64 {
        self.gap.as_ref().map_or(0, |gap| gap.remaining)
    }

    /// Frames pulled from the source so far, rejected ones included.
    pub fn frames_seen(&self) -> usize {
        self.index
    }

    fn check<F: Classify>(&self, index: usize, frame: &F) -> Result<f64> {
        let reason = match frame.timestamp() {
            None => FrameIssue::MissingTimestamp,
            Some(ts) if !ts.is_finite() => FrameIssue::NonFiniteTimestamp(ts),
            Some(ts) => match self.last_ts {
                Some(previous) if ts < previous => FrameIssue::OutOfOrder { ts, previous },
                _ => return Ok(ts),
            },
        };
        warn!(index, %reason, "frame rejected");
        Err(Error::InvalidFrame { index, reason })
    }

    fn push<F: Classify>(&mut self, frame: &F) -> Result<()> {
        let index = self.index;
        self.index += 1;
        let ts = self.check(index, frame)?;

        let period = self.period;
        let window = self.window.get_or_insert_with(|| WindowCount::new(ts));
        let elapsed = ts - window.start();
        if elapsed > period {
            let snapshot = window.flush();
            debug!(start = snapshot.start, total = snapshot.total, "window closed");
            self.gap = Gap::after(snapshot.start, elapsed, period);
            self.closed = Some(snapshot);
            *window = WindowCount::new(ts);
        }
        window.apply(frame);
        self.last_ts = Some(ts);
        Ok(())
    }

    fn next_gap(&mut self) -> Option<Snapshot> {
        let gap = self.gap.as_mut()?;
        let snapshot = Snapshot::empty(gap.start);
        gap.start += self.period;
        gap.remaining -= 1;
        if gap.remaining == 0 {
            self.gap = None;
        }
        debug!(start = snapshot.start, "empty window");
        Some(snapshot)
    }

    fn finish(&mut self) -> Option<Snapshot> {
        self.exhausted = true;
        let mut window = self.window.take()?;
        if window.is_empty() {
            return None;
        }
        let snapshot = window.flush();
        debug!(start = snapshot.start, total = snapshot.total, "last window flushed");
        Some(snapshot)
    }
}

/// Run of empty windows between a closed window and the frame that closed it.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Gap {
    start: f64,
    remaining: u64,
}

impl Gap {
    /// Whole periods skipped when a frame arrives `elapsed` seconds after the
    /// start of a window that was open for `period`.
    fn after(closed: f64, elapsed: f64, period: f64) -> Option<Gap> {
        let excess = elapsed - period;
        let count = (excess / period).ceil() - 1.0;
        if count >= 1.0 {
            Some(Gap { start: closed + period, remaining: count as u64 })
        } else {
            None
        }
    }
}

impl<I, F, E> Iterator for Windows<I>
    where
        I: Iterator<Item=std::result::Result<F, E>>,
        F: Classify,
        E: Into<Error>,
{
    type Item = Result<Snapshot>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(snapshot) = self.closed.take().or_else(|| self.next_gap()) {
                return Some(Ok(snapshot));
            }
            if self.exhausted {
                return None;
            }
            match self.frames.next() {
                Some(Ok(frame)) => {
                    if let Err(e) = self.push(&frame) {
                        return Some(Err(e));
                    }
                }
                Some(Err(e)) => return Some(Err(e.into())),
                None => return self.finish().map(Ok),
            }
        }
    }
}

type Infallibly<I, F> = Map<I, fn(F) -> std::result::Result<F, Infallible>>;

/// Windows over anything yielding frames directly.
pub fn windows<I>(frames: I, period: Period) -> Windows<Infallibly<I::IntoIter, I::Item>>
    where I: IntoIterator, I::Item: Classify
{
    frames.into_iter().traffic_windows(period)
}

pub trait WindowsExt: Iterator + Sized {
    /// Windows over an infallible frame iterator.
    fn traffic_windows(self, period: Period) -> Windows<Infallibly<Self, Self::Item>>
        where Self::Item: Classify
    {
        let wrap: fn(Self::Item) -> std::result::Result<Self::Item, Infallible> = Ok;
        Windows::new(self.map(wrap), period)
    }

    /// Windows over an iterator of `Result<frame, error>`.
    fn try_traffic_windows<F, E>(self, period: Period) -> Windows<Self>
        where Self: Iterator<Item=std::result::Result<F, E>>, F: Classify, E: Into<Error>
    {
        Windows::new(self, period)
    }
}

impl<I: Iterator> WindowsExt for I {}

#[cfg(test)]
mod tests {
    use crate::classify::FrameRecord;

    use super::*;

    fn period(secs: f64) -> Period {
        Period::new(secs).unwrap()
    }

    fn at(ts: &[f64]) -> Vec<FrameRecord> {
        ts.iter().map(|&t| FrameRecord::new(t, 100)).collect()
    }

    #[test]
    fn empty_input_emits_nothing() {
        let snapshots: Vec<_> = windows(Vec::<FrameRecord>::new(), period(3.0)).collect();
        assert!(snapshots.is_empty());
    }

    #[test]
    fn frame_on_the_boundary_stays() {
        let snapshots = WindowCount::compute(at(&[0.0, 10.0]), period(10.0)).unwrap();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].total, 2);
    }

    #[test]
    fn frame_past_the_boundary_rolls_over() {
        let snapshots = WindowCount::compute(at(&[0.0, 10.0001]), period(10.0)).unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].total, 1);
        assert_eq!(snapshots[1].total, 1);
        assert_eq!(snapshots[1].start, 10.0001);
    }

    #[test]
    fn gaps_are_filled_lazily() {
        let frames = at(&[0.0, 17.0]);
        let mut windows = frames.iter().traffic_windows(period(5.0));

        let first = windows.next().unwrap().unwrap();
        assert_eq!((first.start, first.total), (0.0, 1));
        let second = windows.next().unwrap().unwrap();
        assert_eq!(second, Snapshot::empty(5.0));
        let third = windows.next().unwrap().unwrap();
        assert_eq!(third, Snapshot::empty(10.0));
        assert_eq!(windows.pending().map(WindowCount::start), Some(17.0));

        let last = windows.next().unwrap().unwrap();
        assert_eq!((last.start, last.total), (17.0, 1));
        assert!(windows.next().is_none());
        assert!(windows.next().is_none());
    }

    #[test]
    fn long_gaps_are_counted_not_queued() {
        let frames = at(&[0.0, 1e9]);
        let mut windows = frames.iter().traffic_windows(period(1e-3));
        assert_eq!(windows.next().unwrap().unwrap().start, 0.0);

        let queued = windows.queued_gaps();
        assert!(queued > 999_999_999_000);
        for _ in 0..3 {
            assert!(windows.next().unwrap().unwrap().is_empty());
        }
        assert_eq!(windows.queued_gaps(), queued - 3);
        assert_eq!(windows.pending().map(WindowCount::start), Some(1e9));
        assert_eq!(windows.frames_seen(), 2);
    }

    #[test]
    fn period_below_timestamp_resolution_still_ends() {
        let frames = at(&[1e9, 1e9 + 4.0]);
        let mut windows = frames.iter().traffic_windows(period(1e-8));
        windows.next().unwrap().unwrap();
        assert!(windows.queued_gaps() > 0);
        assert!(windows.queued_gaps() < u64::MAX);
    }

    #[test]
    fn gap_count() {
        assert_eq!(Gap::after(0.0, 17.0, 5.0), Some(Gap { start: 5.0, remaining: 2 }));
        assert_eq!(Gap::after(0.0, 20.0, 5.0), Some(Gap { start: 5.0, remaining: 2 }));
        assert_eq!(Gap::after(0.0, 10.0001, 5.0), Some(Gap { start: 5.0, remaining: 1 }));
        assert_eq!(Gap::after(0.0, 10.0, 5.0), None);
        assert_eq!(Gap::after(0.0, 5.5, 5.0), None);
    }

    #[test]
    fn last_window_is_flushed_at_end_of_input() {
        let frames = at(&[0.0, 1.0, 2.0]);
        let mut windows = frames.iter().traffic_windows(period(5.0));
        assert_eq!(windows.next().unwrap().unwrap().total, 3);
        assert_eq!(windows.frames_seen(), 3);
        assert!(windows.pending().is_none());
        assert!(windows.next().is_none());
    }

    #[test]
    fn stopping_early_leaves_the_window_open() {
        let frames = at(&[0.0, 1.0, 2.0, 10.0, 11.0]);
        let mut windows = frames.iter().traffic_windows(period(5.0));
        assert_eq!(windows.next().unwrap().unwrap().total, 3);

        let open = windows.pending().unwrap();
        assert_eq!(open.start(), 10.0);
        assert_eq!(open.len(), 1);
        assert_eq!(windows.frames_seen(), 4);

        let partial = windows.discard().unwrap();
        assert_eq!(partial.start(), 10.0);
        assert_eq!(partial.len(), 1);
    }

    #[test]
    fn bad_timestamps_are_rejected_and_skipped() {
        let mut frames = at(&[0.0, 1.0]);
        frames.insert(1, FrameRecord { ts: None, ..FrameRecord::new(0.0, 1) });
        frames.insert(2, FrameRecord::new(f64::NAN, 1));
        frames.push(FrameRecord::new(0.5, 1));

        let results: Vec<_> = frames.iter().traffic_windows(period(5.0)).collect();
        assert_eq!(results.len(), 4);
        assert!(matches!(
            results[0],
            Err(Error::InvalidFrame { index: 1, reason: FrameIssue::MissingTimestamp })
        ));
        assert!(matches!(
            results[1],
            Err(Error::InvalidFrame { index: 2, reason: FrameIssue::NonFiniteTimestamp(_) })
        ));
        assert!(matches!(
            results[2],
            Err(Error::InvalidFrame { index: 4, reason: FrameIssue::OutOfOrder { .. } })
        ));
        let snapshot = results[3].as_ref().unwrap();
        assert_eq!(snapshot.total, 2);
        assert_eq!(snapshot.bytes, 200);
    }

    #[test]
    fn source_errors_pass_through() {
        let source = vec![
            Ok(FrameRecord::new(0.0, 10)),
            Err(Error::Source("truncated block".into())),
            Ok(FrameRecord::new(1.0, 10)),
        ];
        let results: Vec<_> = source.into_iter().try_traffic_windows(period(5.0)).collect();
        assert!(matches!(results[0], Err(Error::Source(_))));
        assert_eq!(results[1].as_ref().unwrap().total, 2);
    }
}
