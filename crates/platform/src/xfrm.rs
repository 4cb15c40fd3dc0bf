//! XFRM state and policy descriptors
//!
//! These are the fully-specified values handed to an
//! [`XfrmProgrammer`](crate::XfrmProgrammer). They mirror the kernel's
//! `xfrm_usersa_info` / `xfrm_userpolicy_info` shapes closely enough that a
//! netlink backend can translate them field by field.

use std::fmt;
use std::net::IpAddr;
use zeroize::Zeroizing;

use crate::Cidr;

/// IP protocol number for ESP
pub const IPPROTO_ESP: u8 = 50;

/// An algorithm name and its key material
///
/// The key is wiped from memory on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct XfrmAlgo {
    /// Kernel crypto API name, e.g. `hmac(sha256)` or `cbc(aes)`
    pub name: String,
    /// Raw key bytes
    pub key: Zeroizing<Vec<u8>>,
}

impl XfrmAlgo {
    /// Create a new algorithm descriptor
    pub fn new(name: impl Into<String>, key: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            key: Zeroizing::new(key.into()),
        }
    }

    /// Key length in bits, as the kernel expects it
    pub fn key_bits(&self) -> usize {
        self.key.len() * 8
    }
}

impl fmt::Debug for XfrmAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XfrmAlgo")
            .field("name", &self.name)
            .field("key_bits", &self.key_bits())
            .finish()
    }
}

/// XFRM encapsulation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum XfrmMode {
    /// Transport mode
    Transport,
    /// Tunnel mode
    #[default]
    Tunnel,
}

/// Direction of an XFRM policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PolicyDir {
    /// Traffic arriving for local delivery
    In,
    /// Traffic leaving the host
    Out,
    /// Traffic being forwarded
    Fwd,
}

impl fmt::Display for PolicyDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyDir::In => write!(f, "in"),
            PolicyDir::Out => write!(f, "out"),
            PolicyDir::Fwd => write!(f, "fwd"),
        }
    }
}

/// Packet mark and mask used to bind a state or policy to marked traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct XfrmMark {
    /// Mark value
    pub value: u32,
    /// Mask applied before comparing
    pub mask: u32,
}

impl XfrmMark {
    /// Create a new mark
    pub const fn new(value: u32, mask: u32) -> Self {
        Self { value, mask }
    }

    /// True if every bit of `value` is covered by `mask`
    pub fn is_consistent(&self) -> bool {
        self.value & !self.mask == 0
    }
}

impl fmt::Display for XfrmMark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}/{:#x}", self.value, self.mask)
    }
}

/// A Security Association
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XfrmState {
    /// Outer source address
    pub src: IpAddr,
    /// Outer destination address
    pub dst: IpAddr,
    /// Security Parameter Index
    pub spi: u32,
    /// Request id tying the state to policy templates
    pub reqid: u32,
    /// IP protocol (always ESP here)
    pub proto: u8,
    /// Encapsulation mode
    pub mode: XfrmMode,
    /// Integrity algorithm
    pub auth: XfrmAlgo,
    /// Encryption algorithm
    pub crypt: XfrmAlgo,
    /// Optional mark
    pub mark: Option<XfrmMark>,
}

impl XfrmState {
    /// Identity of this state for lookups and deletes
    pub fn id(&self) -> XfrmStateId {
        XfrmStateId {
            src: self.src,
            dst: self.dst,
            spi: Some(self.spi),
        }
    }
}

/// Identifies one or more states
///
/// With `spi: None` every state between `src` and `dst` matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XfrmStateId {
    /// Outer source address
    pub src: IpAddr,
    /// Outer destination address
    pub dst: IpAddr,
    /// SPI, or any
    pub spi: Option<u32>,
}

impl XfrmStateId {
    /// Match any SPI between two endpoints
    pub fn between(src: IpAddr, dst: IpAddr) -> Self {
        Self {
            src,
            dst,
            spi: None,
        }
    }

    /// Whether `state` is covered by this id
    pub fn matches(&self, state: &XfrmState) -> bool {
        self.src == state.src
            && self.dst == state.dst
            && self.spi.map_or(true, |spi| spi == state.spi)
    }
}

impl fmt::Display for XfrmStateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.spi {
            Some(spi) => write!(f, "state {} -> {} spi {:#x}", self.src, self.dst, spi),
            None => write!(f, "state {} -> {}", self.src, self.dst),
        }
    }
}

/// Template describing which state a policy resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XfrmTemplate {
    /// Tunnel source
    pub src: IpAddr,
    /// Tunnel destination
    pub dst: IpAddr,
    /// IP protocol
    pub proto: u8,
    /// Encapsulation mode
    pub mode: XfrmMode,
    /// Request id matching [`XfrmState::reqid`]
    pub reqid: u32,
}

/// A traffic selection policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XfrmPolicy {
    /// Source selector
    pub src: Cidr,
    /// Destination selector
    pub dst: Cidr,
    /// Policy direction
    pub dir: PolicyDir,
    /// Policy priority (lower wins)
    pub priority: u32,
    /// Optional mark
    pub mark: Option<XfrmMark>,
    /// Template the policy resolves to
    pub tmpl: XfrmTemplate,
}

/// Identifies policies by tunnel endpoints and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XfrmPolicyId {
    /// Tunnel source in the template
    pub src: IpAddr,
    /// Tunnel destination in the template
    pub dst: IpAddr,
    /// Policy direction
    pub dir: PolicyDir,
}

impl XfrmPolicyId {
    /// Whether `policy` is covered by this id
    pub fn matches(&self, policy: &XfrmPolicy) -> bool {
        self.dir == policy.dir && self.src == policy.tmpl.src && self.dst == policy.tmpl.dst
    }
}

impl fmt::Display for XfrmPolicyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "policy {} {} -> {}", self.dir, self.src, self.dst)
    }
}
