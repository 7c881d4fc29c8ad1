/*!
This module defines the CBHE/IPN endpoint identifier used throughout BPv6:
a `(node, service)` pair whose textual form is `ipn:<node>.<service>`. No
dictionary-compressed or `dtn:` scheme EIDs are supported — the primary
block codec rejects any bundle declaring a non-zero dictionary length.
*/

use alloc::string::{String, ToString};
use thiserror::Error;

/// Errors raised while parsing an EID's textual form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("EID is missing the 'ipn:' scheme prefix")]
    MissingScheme,

    #[error("EID is missing the node.service separator")]
    MissingSeparator,

    #[error("invalid node number {0:?}")]
    InvalidNode(String),

    #[error("invalid service number {0:?}")]
    InvalidService(String),
}

/// A CBHE/IPN endpoint identifier: a node number and a service number.
#[derive(Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Eid {
    pub node: u64,
    pub service: u64,
}

impl Eid {
    pub const fn new(node: u64, service: u64) -> Self {
        Self { node, service }
    }

    /// The null endpoint, `ipn:0.0`, used as a sentinel source for bundles
    /// whose creator declines to be identified.
    pub const fn null() -> Self {
        Self { node: 0, service: 0 }
    }

    pub fn is_null(&self) -> bool {
        self.node == 0 && self.service == 0
    }
}

impl core::fmt::Display for Eid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ipn:{}.{}", self.node, self.service)
    }
}

impl core::fmt::Debug for Eid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "ipn({}, {})", self.node, self.service)
    }
}

impl core::str::FromStr for Eid {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix("ipn:").ok_or(Error::MissingScheme)?;
        let (node, service) = rest.split_once('.').ok_or(Error::MissingSeparator)?;
        Ok(Self {
            node: node.parse().map_err(|_| Error::InvalidNode(node.to_string()))?,
            service: service
                .parse()
                .map_err(|_| Error::InvalidService(service.to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_round_trip() {
        let eid = Eid::new(10, 1);
        let text = eid.to_string();
        assert_eq!(text, "ipn:10.1");
        assert_eq!(text.parse::<Eid>().unwrap(), eid);
    }

    #[test]
    fn rejects_missing_scheme() {
        assert!(matches!("10.1".parse::<Eid>(), Err(Error::MissingScheme)));
    }

    #[test]
    fn rejects_missing_separator() {
        assert!(matches!("ipn:10".parse::<Eid>(), Err(Error::MissingSeparator)));
    }

    #[test]
    fn null_eid_is_recognised() {
        assert!(Eid::null().is_null());
        assert!(!Eid::new(1, 0).is_null());
    }
}
