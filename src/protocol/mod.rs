use async_trait::async_trait;

mod scpi;
mod scpi_serial;
mod scpi_tcp;

pub use scpi::ScpiProtocol;
pub use scpi_serial::ScpiSerialProtocol;
pub use scpi_tcp::ScpiTcpProtocol;

use crate::{error::Result, model::ModelInfo};

/// Transport to a physical instrument: connect/disconnect plus
/// identification. The AWG drivers under `awg::drivers` layer
/// [`ScpiProtocol`] on top of this to reach the generator a Bode sweep
/// is actually driving.
#[async_trait]
pub trait Protocol: Send + Sync {
    async fn connect(&mut self) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;

    async fn model(&mut self) -> Result<ModelInfo>;
}
