pub mod awg;
pub mod config;
pub mod error;
pub mod model;
pub mod portmap;
pub mod protocol;
pub mod rpc;
pub mod scpi;
pub mod vxi11;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
