//! Endpoint manager configuration
//!
//! Provides the configuration structure and builder for [`EndpointManager`](super::EndpointManager).

use podsec_platform::{XfrmMark, XfrmMode};
use std::path::PathBuf;

use super::{Error, Result};

/// Default key file location
pub const DEFAULT_KEY_FILE: &str = "/etc/ipsec/keys";

/// Mark carried by packets the datapath wants decrypted
pub const DEFAULT_DECRYPT_MARK: XfrmMark = XfrmMark::new(0x0d00, 0x0f00);

/// Mark carried by packets the datapath wants encrypted
pub const DEFAULT_ENCRYPT_MARK: XfrmMark = XfrmMark::new(0x0e00, 0x0f00);

/// Configuration for endpoint programming
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Key file read by `EndpointManager::load_keys`
    pub key_file: PathBuf,

    /// Mark on inbound states and policies
    pub in_mark: Option<XfrmMark>,

    /// Mark on outbound states and policies
    pub out_mark: Option<XfrmMark>,

    /// Encapsulation mode for states and templates
    pub mode: XfrmMode,

    /// Priority of installed policies
    pub policy_priority: u32,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            key_file: PathBuf::from(DEFAULT_KEY_FILE),
            in_mark: Some(DEFAULT_DECRYPT_MARK),
            out_mark: Some(DEFAULT_ENCRYPT_MARK),
            mode: XfrmMode::Tunnel,
            policy_priority: 0,
        }
    }
}

impl EndpointConfig {
    /// Create builder for endpoint configuration
    pub fn builder() -> EndpointConfigBuilder {
        EndpointConfigBuilder::new()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.key_file.as_os_str().is_empty() {
            return Err(Error::InvalidParameter("key_file cannot be empty".into()));
        }
        for (name, mark) in [("in_mark", self.in_mark), ("out_mark", self.out_mark)] {
            if let Some(mark) = mark {
                if !mark.is_consistent() {
                    return Err(Error::InvalidParameter(format!(
                        "{} value {:#x} has bits outside mask {:#x}",
                        name, mark.value, mark.mask
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Builder for EndpointConfig
#[derive(Default)]
pub struct EndpointConfigBuilder {
    key_file: Option<PathBuf>,
    in_mark: Option<Option<XfrmMark>>,
    out_mark: Option<Option<XfrmMark>>,
    mode: Option<XfrmMode>,
    policy_priority: Option<u32>,
}

impl EndpointConfigBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set key file path
    pub fn with_key_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.key_file = Some(path.into());
        self
    }

    /// Set inbound mark (`None` disables marking)
    pub fn with_in_mark(mut self, mark: Option<XfrmMark>) -> Self {
        self.in_mark = Some(mark);
        self
    }

    /// Set outbound mark (`None` disables marking)
    pub fn with_out_mark(mut self, mark: Option<XfrmMark>) -> Self {
        self.out_mark = Some(mark);
        self
    }

    /// Set encapsulation mode
    pub fn with_mode(mut self, mode: XfrmMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set policy priority
    pub fn with_policy_priority(mut self, priority: u32) -> Self {
        self.policy_priority = Some(priority);
        self
    }

    /// Build EndpointConfig with validation
    pub fn build(self) -> Result<EndpointConfig> {
        let defaults = EndpointConfig::default();
        let config = EndpointConfig {
            key_file: self.key_file.unwrap_or(defaults.key_file),
            in_mark: self.in_mark.unwrap_or(defaults.in_mark),
            out_mark: self.out_mark.unwrap_or(defaults.out_mark),
            mode: self.mode.unwrap_or(defaults.mode),
            policy_priority: self.policy_priority.unwrap_or(defaults.policy_priority),
        };

        config.validate()?;
        Ok(config)
    }
}
