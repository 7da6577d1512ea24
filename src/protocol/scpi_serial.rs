use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use crate::{
    error::{Error, Result},
    model::ModelInfo,
    protocol::{Protocol, ScpiProtocol},
};

pub struct ScpiSerialProtocol {
    port: String,
    baud: u32,
    serial: Option<SerialStream>,
}
impl ScpiSerialProtocol {
    pub fn new(port: &str, baud: u32) -> Self {
        Self {
            port: port.to_string(),
            baud,
            serial: None,
        }
    }
}
#[async_trait]
impl Protocol for ScpiSerialProtocol {
    async fn connect(&mut self) -> Result<()> {
        if self.serial.is_some() {
            return Err(Error::Unspecified("Already connected".into()));
        }

        let serial = tokio_serial::new(&self.port, self.baud)
            .open_native_async()
            .map_err(|e| Error::Unhandled(e.into()))?;
        self.serial = Some(serial);

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.serial.take();
        Ok(())
    }

    async fn model(&mut self) -> Result<ModelInfo> {
        (self as &mut dyn ScpiProtocol).idn_model().await
    }
}
#[async_trait]
impl ScpiProtocol for ScpiSerialProtocol {
    async fn int_send(&mut self, data: &[u8]) -> Result<()> {
        let Some(serial) = &mut self.serial else {
            return Err(Error::Unspecified("Not connected".into()));
        };

        debug!(
            "int_send(): {}",
            String::from_utf8_lossy(data)
                .replace('\n', "␤")
                .replace('\r', "␊")
        );

        serial
            .write_all(data)
            .await
            .map_err(|e| Error::Unhandled(e.into()))?;

        Ok(())
    }

    async fn int_recv(&mut self) -> Result<Vec<u8>> {
        let Some(serial) = &mut self.serial else {
            return Err(Error::Unspecified("Not connected".into()));
        };

        let mut resp = vec![];
        let mut stream = BufReader::new(serial);
        /* TODO: Timeout */
        stream
            .read_until(b'\n', &mut resp)
            .await
            .map_err(|e| Error::Unhandled(e.into()))?;

        debug!(
            "int_recv: {}",
            String::from_utf8_lossy(&resp)
                .replace('\n', "␤")
                .replace('\r', "␊")
        );

        Ok(resp)
    }

    async fn int_query(&mut self, data: &[u8]) -> Result<Vec<u8>> {
        self.int_send(data).await?;
        self.int_recv().await
    }
}
