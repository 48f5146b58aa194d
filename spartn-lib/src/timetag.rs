//! GNSS time tags.
//!
//! The transport layer carries either a 32-bit time tag, seconds since the SPARTN time
//! origin of 2010-01-01T00:00:00 GPST, or a 16-bit time tag, seconds within the current
//! half day. The 16-bit form cannot be expanded to 32 bits from the frame alone; it
//! needs an absolute time from some other source in the same stream, e.g., a frame
//! with a 32-bit time tag or a concurrent receiver message. [TimeAnchor] holds that
//! absolute time.
use std::sync::{Arc, RwLock};

use crate::prelude::*;

/// Seconds in the half day covered by a 16-bit time tag.
pub const HALF_DAY_SECS: u32 = 43_200;
const QUARTER_DAY_SECS: i64 = 21_600;

/// Number of seconds between the GPS epoch (1980-01-06) and the SPARTN time origin.
#[cfg(feature = "timecode")]
const SPARTN_GPST_DELTA_SECS: f64 = 946_339_200.0;

/// Expand a 16-bit half-day time tag to a 32-bit time tag using `anchor`, an absolute
/// 32-bit time tag close to the time of the frame.
///
/// The result is the time with the tag's second-of-half-day that is nearest to
/// `anchor`, so the anchor must be within a quarter day of the frame time.
///
/// # Errors
/// [Error::InvalidTimeTag] if `tag` is not a valid second of a half day.
pub fn expand_time_tag(tag: u16, anchor: u32) -> Result<u32> {
    let half_day = i64::from(HALF_DAY_SECS);
    if i64::from(tag) >= half_day {
        return Err(Error::InvalidTimeTag(tag));
    }
    let anchor = i64::from(anchor);
    let mut time = anchor - anchor % half_day + i64::from(tag);
    if time > anchor + QUARTER_DAY_SECS && time >= half_day {
        time -= half_day;
    } else if time + QUARTER_DAY_SECS < anchor {
        time += half_day;
    }
    u32::try_from(time).map_err(|_| Error::InvalidTimeTag(tag))
}

/// Convert a 32-bit time tag to an [Epoch](hifitime::Epoch).
#[cfg(feature = "timecode")]
#[must_use]
pub fn epoch(time_tag: u32) -> hifitime::Epoch {
    hifitime::Epoch::from_gpst_seconds(SPARTN_GPST_DELTA_SECS + f64::from(time_tag))
}

/// Shared, absolute time reference used to expand 16-bit time tags.
///
/// Clones share the same value. Updates are last-writer-wins, so a [Decoder](crate::Decoder)
/// holding an anchor will keep it current with every 32-bit time tag it decodes, and a
/// caller may set it from any other time source, e.g., a receiver navigation message.
#[derive(Debug, Clone, Default)]
pub struct TimeAnchor(Arc<RwLock<Option<u32>>>);

impl TimeAnchor {
    /// Create an anchor with no time set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an anchor with an initial 32-bit time tag.
    #[must_use]
    pub fn with_time(time_tag: u32) -> Self {
        let anchor = Self::default();
        anchor.set(time_tag);
        anchor
    }

    pub fn set(&self, time_tag: u32) {
        match self.0.write() {
            Ok(mut guard) => *guard = Some(time_tag),
            Err(poisoned) => *poisoned.into_inner() = Some(time_tag),
        }
    }

    #[must_use]
    pub fn get(&self) -> Option<u32> {
        match self.0.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Expand `tag` using the current anchor time.
    ///
    /// # Errors
    /// [Error::AmbiguousTimeTag] if no anchor time is set, or [Error::InvalidTimeTag].
    pub fn expand(&self, tag: u16) -> Result<u32> {
        match self.get() {
            Some(anchor) => expand_time_tag(tag, anchor),
            None => Err(Error::AmbiguousTimeTag(tag)),
        }
    }
}
