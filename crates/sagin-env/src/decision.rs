//! Offloading decisions and their integer codes

use serde::{Deserialize, Serialize};

/// Number of places a task can execute
pub const NUM_DECISIONS: usize = 3;

/// Highest valid decision code
pub const MAX_DECISION_CODE: u8 = 2;

/// Where a device's task executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Decision {
    Local = 0,
    Relay = 1,
    Satellite = 2,
}

impl Decision {
    pub const ALL: [Decision; NUM_DECISIONS] = [Decision::Local, Decision::Relay, Decision::Satellite];

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Decision::Local),
            1 => Some(Decision::Relay),
            2 => Some(Decision::Satellite),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

/// Decode a two-bit register `(high, low)` into a decision code.
///
/// `(1, 1)` would be 3 and is clamped to satellite, so under uniform bits
/// satellite receives half of the probability mass instead of a third.
#[inline]
pub fn decode_bits(high: u8, low: u8) -> u8 {
    (high * 2 + low).min(MAX_DECISION_CODE)
}

/// Count how many devices picked each option in one decision vector
pub fn decision_histogram<'a, I>(codes: I) -> [usize; NUM_DECISIONS]
where
    I: IntoIterator<Item = &'a u8>,
{
    let mut counts = [0usize; NUM_DECISIONS];
    for &code in codes {
        counts[usize::from(code.min(MAX_DECISION_CODE))] += 1;
    }
    counts
}
