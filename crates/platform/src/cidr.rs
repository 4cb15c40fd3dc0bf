//! Address ranges in CIDR notation
//!
//! A [`Cidr`] keeps the address exactly as written, so `10.1.3.4/16` names
//! both the host `10.1.3.4` and the range `10.1.0.0/16`. Callers that need the
//! range use [`Cidr::network`]; callers that need the endpoint address use
//! [`Cidr::addr`].

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// An IP address together with a prefix length
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cidr {
    addr: IpAddr,
    prefix_len: u8,
}

/// Error returned when a string is not valid CIDR notation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CidrParseError(String);

impl fmt::Display for CidrParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid CIDR: {}", self.0)
    }
}

impl std::error::Error for CidrParseError {}

impl Cidr {
    /// Create a CIDR, validating the prefix length against the address family
    pub fn new(addr: IpAddr, prefix_len: u8) -> Result<Self, CidrParseError> {
        if prefix_len > max_prefix_len(&addr) {
            return Err(CidrParseError(format!(
                "prefix length {} too long for {}",
                prefix_len, addr
            )));
        }
        Ok(Self { addr, prefix_len })
    }

    /// Single-host range (`/32` or `/128`)
    pub fn host(addr: IpAddr) -> Self {
        Self {
            addr,
            prefix_len: max_prefix_len(&addr),
        }
    }

    /// Address as written
    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    /// Prefix length
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// The range with host bits cleared
    pub fn network(&self) -> Cidr {
        let addr = match self.addr {
            IpAddr::V4(v4) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                IpAddr::V4(Ipv4Addr::from(u32::from(v4) & mask))
            }
            IpAddr::V6(v6) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                IpAddr::V6(Ipv6Addr::from(u128::from(v6) & mask))
            }
        };
        Cidr {
            addr,
            prefix_len: self.prefix_len,
        }
    }

    /// Whether `ip` falls inside this range
    pub fn contains(&self, ip: &IpAddr) -> bool {
        if self.addr.is_ipv4() != ip.is_ipv4() {
            return false;
        }
        Cidr::new(*ip, self.prefix_len)
            .map(|other| other.network().addr == self.network().addr)
            .unwrap_or(false)
    }
}

fn max_prefix_len(addr: &IpAddr) -> u8 {
    match addr {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

impl FromStr for Cidr {
    type Err = CidrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (addr, prefix) = s
            .split_once('/')
            .ok_or_else(|| CidrParseError(format!("missing prefix length in {:?}", s)))?;
        let addr: IpAddr = addr
            .parse()
            .map_err(|e| CidrParseError(format!("{:?}: {}", s, e)))?;
        let prefix_len: u8 = prefix
            .parse()
            .map_err(|e| CidrParseError(format!("{:?}: {}", s, e)))?;
        Cidr::new(addr, prefix_len)
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix_len)
    }
}

impl From<IpAddr> for Cidr {
    fn from(addr: IpAddr) -> Self {
        Cidr::host(addr)
    }
}
