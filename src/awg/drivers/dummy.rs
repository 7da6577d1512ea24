//! A driver that talks to nothing. Every call is logged and succeeds
//! immediately; useful for exercising the VXI-11/SCPI stack against a
//! scope without a generator on the bench.

use async_trait::async_trait;

use crate::awg::{AwgDriver, OutputLoad, WaveformType};
use crate::error::Result;

#[derive(Default)]
pub struct DummyDriver;

#[async_trait]
impl AwgDriver for DummyDriver {
    async fn connect(&mut self) -> Result<()> {
        log::info!("dummy: connect");
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        log::info!("dummy: disconnect");
        Ok(())
    }

    async fn initialize_channel(&mut self, channel: u8) -> Result<()> {
        log::info!("dummy: initialize_channel({channel})");
        Ok(())
    }

    async fn set_output_load(&mut self, channel: u8, load: OutputLoad) -> Result<()> {
        log::info!("dummy: ch{channel} set_output_load({load:?})");
        Ok(())
    }

    async fn set_output_on(&mut self, channel: u8, enabled: bool) -> Result<()> {
        log::info!("dummy: ch{channel} set_output_on({enabled})");
        Ok(())
    }

    async fn set_waveform_type(&mut self, channel: u8, waveform: WaveformType) -> Result<()> {
        log::info!("dummy: ch{channel} set_waveform_type({waveform})");
        Ok(())
    }

    async fn set_frequency(&mut self, channel: u8, hertz: f64) -> Result<()> {
        log::info!("dummy: ch{channel} set_frequency({hertz})");
        Ok(())
    }

    async fn set_amplitude(&mut self, channel: u8, volts_pp: f64) -> Result<()> {
        log::info!("dummy: ch{channel} set_amplitude({volts_pp})");
        Ok(())
    }

    async fn set_offset(&mut self, channel: u8, volts: f64) -> Result<()> {
        log::info!("dummy: ch{channel} set_offset({volts})");
        Ok(())
    }

    async fn set_phase(&mut self, channel: u8, degrees: f64) -> Result<()> {
        log::info!("dummy: ch{channel} set_phase({degrees})");
        Ok(())
    }
}
