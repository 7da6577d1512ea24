//! Instrument identity, in both directions this crate needs it:
//!
//! - [`ModelInfo`]/[`Manufacturer`] parse a genuine `*IDN?` response from
//!   the physical AWG a driver connects to (kept from the teacher).
//! - [`AwgIdentity`] is the mirror image: a typed identity this process
//!   *renders* into the exact `IDN-SGLT-PRI?` reply a Siglent scope will
//!   accept as a real Siglent AWG.

use std::fmt::Display;

use crate::error::{Error, Result};

#[derive(Clone, Debug)]
pub struct ModelInfo {
    /// Manufacturer and family
    pub man_family: Manufacturer,
    /// Manufacturer string
    pub manufacturer: String,
    /// Model string
    pub model: String,
    /// Serial number
    pub serial: Option<String>,
    /// Version number (as reported by *IDN?)
    pub version: Option<String>,
}
impl ModelInfo {
    pub fn from_idn(idn: &str) -> Result<Self> {
        let idn_sep: Vec<_> = idn.split(',').collect();
        if idn_sep.len() < 2 {
            return Err(Error::Unspecified(format!("Invalid *IDN? response: {idn}")));
        }

        Ok(Self {
            man_family: Manufacturer::from_idn(&idn_sep)?,
            manufacturer: idn_sep[0].to_string(),
            model: idn_sep[1].to_string(),
            serial: idn_sep.get(2).map(|s| s.to_string()),
            version: idn_sep.get(3).map(|s| s.to_string()),
        })
    }
}

#[derive(Clone, Debug)]
pub enum Manufacturer {
    /// Unknown manufacturer
    Unknown,
    /// Siglent
    Siglent(SiglentFamily),
    /// UNI-T
    UniT,
}
impl Manufacturer {
    fn from_idn(idn: &[&str]) -> Result<Self> {
        let man = idn[0].to_lowercase();

        if man.contains("siglent") {
            Ok(Self::Siglent(SiglentFamily::from_idn(idn)?))
        } else if man.contains("uni-t") || man.contains("uni-trend") {
            Ok(Self::UniT)
        } else {
            Ok(Self::Unknown)
        }
    }
}

#[derive(Clone, Debug)]
pub enum SiglentFamily {
    Unknown,
    /// Siglent SDG800/SDG1000X/SDG2000X/SDG6000X function generator family
    SDG,
}
impl SiglentFamily {
    fn from_idn(idn: &[&str]) -> Result<Self> {
        let model = idn[1].to_lowercase();

        if model.contains("sdg") {
            Ok(Self::SDG)
        } else {
            Ok(Self::Unknown)
        }
    }
}

/// Siglent SDG-family identity the bridge impersonates to the scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SiglentAwgFamily {
    /// SDG1000X series, 1-2 channel, up to ~60MHz
    SDG1000X,
    /// SDG2000X series, 2 channel, up to ~200MHz
    SDG2000X,
    /// SDG6000X series, 2 channel, up to ~600MHz
    SDG6000X,
}
impl SiglentAwgFamily {
    fn model_str(&self) -> &'static str {
        match self {
            Self::SDG1000X => "SDG1062X",
            Self::SDG2000X => "SDG2042X",
            Self::SDG6000X => "SDG6052X",
        }
    }
}

/// Identity reported on `IDN-SGLT-PRI?`.
#[derive(Clone, Debug)]
pub struct AwgIdentity {
    pub family: SiglentAwgFamily,
    pub serial: String,
    pub version: String,
}
impl Default for AwgIdentity {
    fn default() -> Self {
        Self {
            family: SiglentAwgFamily::SDG1000X,
            serial: "SDG00000000000".into(),
            version: "1.01.01.33R1".into(),
        }
    }
}
impl Display for AwgIdentity {
    /// Renders the exact payload queued in response to `IDN-SGLT-PRI?`:
    /// `IDN-SGLT-PRI,<model>,<serial>,<version>`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "IDN-SGLT-PRI,{},{},{}",
            self.family.model_str(),
            self.serial,
            self.version
        )
    }
}
