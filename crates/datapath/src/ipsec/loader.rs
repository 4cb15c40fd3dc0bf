//! Key file loading
//!
//! Streams a key file line by line into a [`KeyStore`]. Records are installed
//! as they are parsed; the first bad line stops the load but does not undo
//! lines installed before it.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::key::KeyRecord;
use super::logging;
use super::store::KeyStore;
use super::{Error, Result};

impl KeyStore {
    /// Load key records from a reader
    ///
    /// Blank lines and lines starting with `#` are skipped. Returns the
    /// number of records installed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] with the offending line number on the first
    /// malformed line (including lines that are not valid UTF-8), or
    /// [`Error::Io`] if reading fails.
    pub fn load<R: BufRead>(&self, reader: R) -> Result<usize> {
        let mut installed = 0;

        for (idx, raw) in reader.split(b'\n').enumerate() {
            let line = String::from_utf8(raw?).map_err(|_| {
                let e = Error::parse("line is not valid UTF-8").at_line(idx + 1);
                logging::log_key_line_rejected(idx + 1, &e.to_string());
                e
            })?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (identity, record) = KeyRecord::parse_line(trimmed).map_err(|e| {
                let e = e.at_line(idx + 1);
                logging::log_key_line_rejected(idx + 1, &e.to_string());
                e
            })?;

            logging::log_key_installed(&identity, &record);
            self.put(identity, record);
            installed += 1;
        }

        Ok(installed)
    }

    /// Load key records from the file at `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] if the file does not exist, otherwise
    /// the errors of [`KeyStore::load`].
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound(path.to_path_buf()),
            _ => Error::from(e),
        })?;

        let installed = self.load(BufReader::new(file))?;
        logging::log_keys_loaded(&path.display().to_string(), installed);
        Ok(installed)
    }
}

/// Load the key file at `path` into the process-wide key store
///
/// # Example
///
/// ```rust,no_run
/// use podsec_datapath::ipsec::load_ipsec_keys_file;
///
/// match load_ipsec_keys_file("/etc/ipsec/keys") {
///     Ok(()) => {}
///     Err(e) if e.is_not_found() => { /* no keys configured yet */ }
///     Err(e) => return Err(e.into()),
/// }
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
///
/// # Errors
///
/// See [`KeyStore::load_file`].
pub fn load_ipsec_keys_file<P: AsRef<Path>>(path: P) -> Result<()> {
    KeyStore::global().load_file(path).map(|_| ())
}
