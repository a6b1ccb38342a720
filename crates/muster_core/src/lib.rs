//! muster_core — Core types, domains, and the seeded lottery RNG.
//!
//! This crate is **I/O-free**. It defines stable types/APIs used across the
//! engine (`muster_algo`, `muster_io`, `muster_pipeline`, `muster_cli`).
//!
//! - Registry tokens: `ParticipantId`, `RoleId`, `PoolId`
//! - Domains: `PriorityTier`, `Capacity`, `RoleDef`/`RoleCatalog`, `Params`
//! - Seedable lottery RNG (ChaCha20) with draw accounting
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod capacity;
pub mod catalog;
pub mod params;
pub mod priority;
pub mod rng;

pub mod errors {
    use core::fmt;

    /// Minimal error set for core-domain validation & parsing.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    pub enum CoreError {
        InvalidToken,
        InvalidCapacity,
        UnknownRole,
        EmptyCatalog,
    }

    impl fmt::Display for CoreError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                CoreError::InvalidToken => write!(f, "invalid token"),
                CoreError::InvalidCapacity => write!(f, "invalid capacity"),
                CoreError::UnknownRole => write!(f, "unknown role"),
                CoreError::EmptyCatalog => write!(f, "empty catalog"),
            }
        }
    }
}

pub mod tokens {
    //! Registry token types (`ParticipantId`, `RoleId`, `PoolId`) with strict charset.

    use crate::errors::CoreError;
    use alloc::string::{String, ToString};
    use core::fmt;
    use core::str::FromStr;

    #[cfg(feature = "serde")]
    use serde::{Deserialize, Serialize};

    fn is_token(s: &str) -> bool {
        let len = s.len();
        if !(1..=64).contains(&len) {
            return false;
        }
        s.bytes().all(|b| matches!(b,
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' |
            b'_' | b'-' | b':' | b'.'
        ))
    }

    macro_rules! def_token {
        ($name:ident) => {
            #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
            #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
            pub struct $name(String);

            impl $name {
                pub fn as_str(&self) -> &str {
                    &self.0
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl FromStr for $name {
                type Err = CoreError;
                fn from_str(s: &str) -> Result<Self, Self::Err> {
                    if is_token(s) {
                        Ok(Self(s.to_string()))
                    } else {
                        Err(CoreError::InvalidToken)
                    }
                }
            }
        };
    }

    def_token!(ParticipantId);
    def_token!(RoleId);
    def_token!(PoolId);

}

// Convenience re-exports (downstream crates import these from the root).
pub use capacity::Capacity;
pub use catalog::{RoleCatalog, RoleDef};
pub use errors::CoreError;
pub use params::Params;
pub use priority::PriorityTier;
pub use tokens::{ParticipantId, PoolId, RoleId};
