//! Eminence: the totally-ordered permission ladder.
//!
//! Every user holds an eminence per bot/client/community scope. Commands
//! declare the minimum eminence they require; a sufficiently high eminence
//! satisfies every lower requirement.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A user's permission level, from lowest to highest.
///
/// The ordering is total and monotonic: `Deity` passes any check that
/// `Operator` or `Master` would pass.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Eminence {
    /// No elevated permissions. The default for unknown users.
    #[default]
    None = 0,
    /// Trusted helper.
    Operator = 1,
    /// Bot administrator.
    Master = 2,
    /// Owner-equivalent.
    Deity = 3,
}

impl Eminence {
    /// Returns whether this eminence satisfies a check requiring `required`.
    pub fn satisfies(self, required: Eminence) -> bool {
        self >= required
    }
}

impl FromStr for Eminence {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "operator" => Ok(Self::Operator),
            "master" => Ok(Self::Master),
            "deity" => Ok(Self::Deity),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Eminence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Operator => "operator",
            Self::Master => "master",
            Self::Deity => "deity",
        };
        write!(f, "{name}")
    }
}
