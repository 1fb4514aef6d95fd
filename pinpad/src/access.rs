//! Entered codes and the access rule.

use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use crate::utils::WithinExt;

/// Number of digits in both the ID and the password.
pub const CODE_LEN: usize = 4;

/// IDs that may be granted access.
pub const VALID_IDS: RangeInclusive<u32> = 2330..=2340;

/// A fixed-length code made of ASCII digits, as typed on the keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Code<const N: usize>(pub(crate) [u8; N]);

impl<const N: usize> Code<N> {
    /// The code read as a decimal number, most significant digit first.
    ///
    /// With [CODE_LEN] digits, `"abcd"` is `1000a + 100b + 10c + d`.
    pub fn value(&self) -> u32 {
        self.0
            .iter()
            .fold(0, |value, &digit| value * 10 + u32::from(digit - b'0'))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl<const N: usize> Display for Code<N> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum AccessDecision {
    Granted,
    Denied,
}

impl AccessDecision {
    /// Text shown on the first LCD line.
    pub fn message(self) -> &'static str {
        match self {
            AccessDecision::Granted => "Access Granted",
            AccessDecision::Denied => "Access Denied",
        }
    }
}

/// Access is granted when the ID is in [VALID_IDS] and the password repeats it.
pub fn check_access(id: u32, password: u32) -> AccessDecision {
    if id.within(VALID_IDS) && password == id {
        AccessDecision::Granted
    } else {
        AccessDecision::Denied
    }
}
