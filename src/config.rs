//! Command-line surface and the derived runtime configuration.
//!
//! Grounded on the sibling VXI-11 project in the wider example pack
//! (`Atmelfan-lxi-rs`, whose manifest pulls in `clap` with the
//! `derive` feature for exactly this kind of instrument-control CLI);
//! the teacher itself, being a library with a throwaway `main.rs`, has
//! no CLI convention of its own to imitate here.

use std::net::IpAddr;

use clap::Parser;

use crate::error::{Error, Result};

/// Baud rate used when nothing else is specified, and the generators
/// don't agree with it (`bk4075` runs fixed at 19200).
const DEFAULT_BAUD_RATE: u32 = 115200;
const BK4075_BAUD_RATE: u32 = 19200;

const DEFAULT_VXI11_PORT: u16 = 9009;
const DEFAULT_VXI11_ALT_PORT: u16 = 9010;

#[derive(Parser, Debug)]
#[command(
    name = "bode",
    about = "Impersonates a Siglent AWG's VXI-11/SCPI interface for third-party waveform generators"
)]
pub struct Cli {
    /// Driver to use: dummy, dg800, utg1000x, jds6600, fy, fy6600, bk4075, ad9910
    pub driver_name: String,

    /// Serial port path (serial drivers) or host:port (TCP drivers)
    pub target: Option<String>,

    /// Serial baud rate; defaults depend on the selected driver
    pub baud_rate: Option<u32>,

    /// Also serve Portmap over UDP/111 (required for SDS800X-HD scopes)
    #[arg(long = "udp")]
    pub udp: bool,

    /// Address to bind the Portmap/VXI-11 listeners on
    #[arg(long, default_value = "0.0.0.0")]
    pub listen: IpAddr,
}
impl Cli {
    pub fn into_config(self) -> Result<Config> {
        let driver = DriverKind::parse(&self.driver_name)?;

        let baud_rate = self.baud_rate.unwrap_or(match driver {
            DriverKind::Bk4075 => BK4075_BAUD_RATE,
            _ => DEFAULT_BAUD_RATE,
        });

        Ok(Config {
            driver,
            target: self.target,
            baud_rate,
            serve_portmap_udp: self.udp,
            listen: self.listen,
            vxi11_port_rotation: (DEFAULT_VXI11_PORT, DEFAULT_VXI11_ALT_PORT),
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverKind {
    Dummy,
    Dg800,
    Utg1000x,
    Jds6600,
    Fy,
    Fy6600,
    Bk4075,
    Ad9910,
}
impl DriverKind {
    fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dummy" => Ok(Self::Dummy),
            "dg800" => Ok(Self::Dg800),
            "utg1000x" => Ok(Self::Utg1000x),
            "jds6600" => Ok(Self::Jds6600),
            "fy" => Ok(Self::Fy),
            "fy6600" => Ok(Self::Fy6600),
            "bk4075" => Ok(Self::Bk4075),
            "ad9910" => Ok(Self::Ad9910),
            other => Err(Error::NotSupported(format!("unknown driver {other:?}"))),
        }
    }

    /// Whether this driver reaches its generator over a raw TCP/VISA
    /// socket (`target` is `host:port`) rather than a serial port.
    pub fn is_tcp(self) -> bool {
        matches!(self, Self::Dg800 | Self::Utg1000x)
    }
}

#[derive(Debug)]
pub struct Config {
    pub driver: DriverKind,
    pub target: Option<String>,
    pub baud_rate: u32,
    pub serve_portmap_udp: bool,
    pub listen: IpAddr,
    pub vxi11_port_rotation: (u16, u16),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bk4075_defaults_to_its_fixed_baud_rate() {
        let cli = Cli {
            driver_name: "bk4075".into(),
            target: Some("/dev/ttyUSB0".into()),
            baud_rate: None,
            udp: false,
            listen: "0.0.0.0".parse().unwrap(),
        };
        let config = cli.into_config().unwrap();
        assert_eq!(config.baud_rate, BK4075_BAUD_RATE);
    }

    #[test]
    fn other_drivers_default_to_115200_baud() {
        let cli = Cli {
            driver_name: "jds6600".into(),
            target: Some("/dev/ttyUSB0".into()),
            baud_rate: None,
            udp: false,
            listen: "0.0.0.0".parse().unwrap(),
        };
        let config = cli.into_config().unwrap();
        assert_eq!(config.baud_rate, DEFAULT_BAUD_RATE);
    }

    #[test]
    fn unknown_driver_name_is_rejected() {
        let cli = Cli {
            driver_name: "not-a-real-generator".into(),
            target: None,
            baud_rate: None,
            udp: false,
            listen: "0.0.0.0".parse().unwrap(),
        };
        assert!(cli.into_config().is_err());
    }
}
