use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{Mutex, RwLock};

use bode_bridge::awg::drivers::dummy::DummyDriver;
use bode_bridge::awg::drivers::scpi_generic::ScpiGenericDriver;
use bode_bridge::awg::drivers::serial_ascii::SerialAsciiDriver;
use bode_bridge::awg::AwgDriver;
use bode_bridge::config::{Cli, Config, DriverKind};
use bode_bridge::error::{Error, Result};
use bode_bridge::model::AwgIdentity;
use bode_bridge::portmap;
use bode_bridge::scpi::ScpiDispatcher;
use bode_bridge::vxi11;

fn build_driver(config: &Config) -> Result<Box<dyn AwgDriver>> {
    if config.driver == DriverKind::Dummy {
        return Ok(Box::new(DummyDriver));
    }

    if config.driver.is_tcp() {
        let target = config
            .target
            .as_deref()
            .ok_or_else(|| Error::NotSupported("TCP driver requires a host:port target".into()))?;
        let addr: SocketAddr = target
            .parse()
            .map_err(|e| Error::NotSupported(format!("invalid target {target:?}: {e}")))?;
        Ok(Box::new(ScpiGenericDriver::new(addr)?))
    } else {
        let target = config
            .target
            .as_deref()
            .ok_or_else(|| Error::NotSupported("serial driver requires a port path".into()))?;
        Ok(Box::new(SerialAsciiDriver::new(target, config.baud_rate)))
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = Cli::parse().into_config()?;
    log::info!("starting with driver {:?}, target {:?}", config.driver, config.target);

    let mut driver = build_driver(&config)?;
    driver.connect().await?;

    let dispatcher = Arc::new(Mutex::new(ScpiDispatcher::new(
        AwgIdentity::default(),
        driver,
    )));

    let active_port = Arc::new(RwLock::new(config.vxi11_port_rotation.0));

    let portmap_tcp = portmap::serve_tcp(
        SocketAddr::new(config.listen, portmap::PORTMAP_PORT),
        active_port.clone(),
    );
    let vxi11_tcp = vxi11::serve(
        config.listen,
        active_port.clone(),
        config.vxi11_port_rotation,
        dispatcher.clone(),
    );

    let result = if config.serve_portmap_udp {
        let portmap_udp = portmap::serve_udp(
            SocketAddr::new(config.listen, portmap::PORTMAP_PORT),
            active_port.clone(),
        );
        tokio::select! {
            r = portmap_tcp => r,
            r = portmap_udp => r,
            r = vxi11_tcp => r,
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down on ctrl-c");
                Ok(())
            }
        }
    } else {
        tokio::select! {
            r = portmap_tcp => r,
            r = vxi11_tcp => r,
            _ = tokio::signal::ctrl_c() => {
                log::info!("shutting down on ctrl-c");
                Ok(())
            }
        }
    };

    dispatcher.lock().await.driver_disconnect().await?;
    result?;
    Ok(())
}
