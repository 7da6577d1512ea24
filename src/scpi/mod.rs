//! SCPI dispatcher for the compact Siglent dialect the scope's Bode
//! sweep speaks: `Cn:MNEMONIC KEY,VALUE,...;...`.
//!
//! Owns the per-channel [`ChannelState`] the core answers `BSWV?` from.
//! A driver call is never read back; every value a query reports comes
//! from this cache, updated in the same left-to-right order the
//! incoming command lists its key/value pairs, so a slow or failing
//! [`AwgDriver`] never desyncs what the scope is told versus what the
//! cache remembers.
//!
//! Grounded on the teacher's `protocol/scpi.rs` dyn-extension style for
//! the public shape (one entry point, `dispatch`, mirroring
//! `ScpiProtocol::query`); the parsing itself has no teacher
//! counterpart since the teacher is a SCPI client, not a parser.

use std::collections::HashMap;

use crate::awg::{AwgDriver, OutputLoad, WaveformType};
use crate::error::{Error, Result};
use crate::model::AwgIdentity;

/// Cached state for one output channel, seeded to the vendor-neutral
/// defaults a freshly linked Siglent AWG reports.
#[derive(Clone, Debug)]
struct ChannelState {
    waveform: WaveformType,
    frequency_hz: f64,
    amplitude_vpp: f64,
    offset_v: f64,
    phase_deg: f64,
    load: OutputLoad,
    enabled: bool,
}
impl Default for ChannelState {
    fn default() -> Self {
        Self {
            waveform: WaveformType::default(),
            frequency_hz: 1000.0,
            amplitude_vpp: 0.0,
            offset_v: 0.0,
            phase_deg: 0.0,
            load: OutputLoad::default(),
            enabled: false,
        }
    }
}

/// Parses a SCPI programmer's numeric value with an optional
/// engineering-unit suffix (`HZ`/`KHZ`/`MHZ`/`V`/`VPP`/`S`/`MS`/`US`/
/// `NS`/`%`). Longer suffixes are tried before the shorter ones they
/// contain (`KHZ` before `HZ`, `VPP` before `V`) so the right scale is
/// picked.
fn parse_engineering(token: &str) -> Result<f64> {
    const SUFFIXES: &[(&str, f64)] = &[
        ("MHZ", 1e6),
        ("KHZ", 1e3),
        ("HZ", 1.0),
        ("VPP", 1.0),
        ("MS", 1e-3),
        ("US", 1e-6),
        ("NS", 1e-9),
        ("S", 1.0),
        ("V", 1.0),
        ("%", 1.0),
    ];

    let upper = token.trim().to_ascii_uppercase();
    for (suffix, scale) in SUFFIXES {
        if let Some(prefix) = upper.strip_suffix(suffix) {
            if prefix.is_empty() {
                continue;
            }
            if let Ok(value) = prefix.parse::<f64>() {
                return Ok(value * scale);
            }
        }
    }
    upper
        .parse::<f64>()
        .map_err(|e| Error::ScpiParse(format!("not a number: {token:?} ({e})")))
}

/// Renders a driver value the way the rest of the reply string expects
/// it: no suffix, trailing zeros trimmed.
fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.6}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

pub struct ScpiDispatcher {
    identity: AwgIdentity,
    driver: Box<dyn AwgDriver>,
    channels: HashMap<u8, ChannelState>,
    seen_channels: std::collections::HashSet<u8>,
    /// Channel addressed by the most recent `Cn:`-prefixed command. A
    /// later command in the same (or a later) write that omits the
    /// prefix — as the scope does for everything after the first
    /// command in a `;`-joined write — is implicitly addressed to this
    /// channel.
    last_channel: u8,
}
impl ScpiDispatcher {
    pub fn new(identity: AwgIdentity, driver: Box<dyn AwgDriver>) -> Self {
        Self {
            identity,
            driver,
            channels: HashMap::new(),
            seen_channels: std::collections::HashSet::new(),
            last_channel: 1,
        }
    }

    /// Disconnects the underlying driver; called once on shutdown.
    pub async fn driver_disconnect(&mut self) -> Result<()> {
        self.driver.disconnect().await
    }

    async fn ensure_initialized(&mut self, channel: u8) -> Result<()> {
        if self.seen_channels.insert(channel) {
            self.driver.initialize_channel(channel).await?;
        }
        Ok(())
    }

    fn state(&mut self, channel: u8) -> &mut ChannelState {
        self.channels.entry(channel).or_default()
    }

    /// Processes one full DEVICE_WRITE payload, which may hold several
    /// `;`-joined commands. Returns the reply to a query, if the
    /// payload contained one; the last query wins if it contained more
    /// than one, matching how the scope never issues more than one per
    /// write in practice.
    pub async fn dispatch(&mut self, payload: &str) -> Option<String> {
        let mut pending = None;
        for raw in payload.split(';') {
            let command = raw.trim();
            if command.is_empty() {
                continue;
            }
            match self.dispatch_one(command).await {
                Ok(Some(reply)) => pending = Some(reply),
                Ok(None) => {}
                Err(e) => log::warn!("ignoring malformed SCPI command {command:?}: {e}"),
            }
        }
        pending
    }

    async fn dispatch_one(&mut self, command: &str) -> Result<Option<String>> {
        let (explicit_channel, rest) = split_channel_prefix(command);
        if let Some(channel) = explicit_channel {
            self.last_channel = channel;
        }

        if rest.eq_ignore_ascii_case("IDN-SGLT-PRI?") {
            return Ok(Some(self.identity.to_string()));
        }
        if rest.eq_ignore_ascii_case("BSWV?") {
            return Ok(Some(self.render_bswv(self.last_channel)));
        }

        let channel = self.last_channel;
        let (mnemonic, args) = split_mnemonic(rest);
        self.ensure_initialized(channel).await?;

        match mnemonic.to_ascii_uppercase().as_str() {
            "OUTP" => self.apply_outp(channel, args).await?,
            "BSWV" => self.apply_bswv(channel, args).await?,
            other => {
                return Err(Error::ScpiParse(format!("unrecognized mnemonic {other:?}")));
            }
        }
        Ok(None)
    }

    async fn apply_outp(&mut self, channel: u8, args: &str) -> Result<()> {
        let tokens: Vec<&str> = args.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();

        if tokens.len() == 1 {
            let enabled = match tokens[0].to_ascii_uppercase().as_str() {
                "ON" => true,
                "OFF" => false,
                other => {
                    return Err(Error::ScpiParse(format!("unrecognized OUTP value {other:?}")));
                }
            };
            self.state(channel).enabled = enabled;
            self.driver.set_output_on(channel, enabled).await?;
            return Ok(());
        }

        for pair in tokens.chunks(2) {
            let [key, value] = pair else {
                return Err(Error::ScpiParse(format!("malformed OUTP args: {args:?}")));
            };
            match key.to_ascii_uppercase().as_str() {
                "LOAD" => {
                    let load = OutputLoad::parse(value)
                        .ok_or_else(|| Error::ScpiParse(format!("unrecognized LOAD value {value:?}")))?;
                    self.state(channel).load = load;
                    self.driver.set_output_load(channel, load).await?;
                }
                "PLRT" => {
                    log::debug!("ignoring unsupported OUTP PLRT,{value}");
                }
                other => log::debug!("ignoring unrecognized OUTP key {other:?}"),
            }
        }
        Ok(())
    }

    async fn apply_bswv(&mut self, channel: u8, args: &str) -> Result<()> {
        let tokens: Vec<&str> = args.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
        for pair in tokens.chunks(2) {
            let [key, value] = pair else {
                return Err(Error::ScpiParse(format!("malformed BSWV args: {args:?}")));
            };
            match key.to_ascii_uppercase().as_str() {
                "WVTP" => {
                    let waveform: WaveformType = value
                        .trim()
                        .to_ascii_uppercase()
                        .parse()
                        .map_err(|_| Error::ScpiParse(format!("unrecognized WVTP value {value:?}")))?;
                    self.state(channel).waveform = waveform;
                    self.driver.set_waveform_type(channel, waveform).await?;
                }
                "FRQ" => {
                    let hz = parse_engineering(value)?;
                    self.state(channel).frequency_hz = hz;
                    self.driver.set_frequency(channel, hz).await?;
                }
                "AMP" => {
                    let vpp = parse_engineering(value)?;
                    self.state(channel).amplitude_vpp = vpp;
                    self.driver.set_amplitude(channel, vpp).await?;
                }
                "OFST" => {
                    let v = parse_engineering(value)?;
                    self.state(channel).offset_v = v;
                    self.driver.set_offset(channel, v).await?;
                }
                "PHSE" => {
                    let deg = parse_engineering(value)?;
                    self.state(channel).phase_deg = deg;
                    self.driver.set_phase(channel, deg).await?;
                }
                "DUTY" => {
                    log::debug!("ignoring unsupported BSWV DUTY,{value}");
                }
                other => log::debug!("ignoring unrecognized BSWV key {other:?}"),
            }
        }
        Ok(())
    }

    fn render_bswv(&mut self, channel: u8) -> String {
        let state = self.channels.entry(channel).or_default().clone();
        let period_s = if state.frequency_hz != 0.0 {
            1.0 / state.frequency_hz
        } else {
            0.0
        };
        let hlev = state.offset_v + state.amplitude_vpp / 2.0;
        let llev = state.offset_v - state.amplitude_vpp / 2.0;
        format!(
            "C{channel}:BSWV WVTP,{},FRQ,{}HZ,PRD,{}S,AMP,{}V,OFST,{}V,HLEV,{}V,LLEV,{}V,PHSE,{}",
            state.waveform,
            fmt_num(state.frequency_hz),
            fmt_num(period_s),
            fmt_num(state.amplitude_vpp),
            fmt_num(state.offset_v),
            fmt_num(hlev),
            fmt_num(llev),
            fmt_num(state.phase_deg),
        )
    }
}

/// Splits a leading `Cn:` channel prefix off a command, if present.
fn split_channel_prefix(command: &str) -> (Option<u8>, &str) {
    if let Some(rest) = command.strip_prefix('C').or_else(|| command.strip_prefix('c')) {
        if let Some((digits, tail)) = rest.split_once(':') {
            if let Ok(channel) = digits.parse::<u8>() {
                return (Some(channel), tail.trim_start());
            }
        }
    }
    (None, command)
}

/// Splits `MNEMONIC rest` on the first whitespace run; a bare mnemonic
/// with no arguments gets an empty `rest`.
fn split_mnemonic(command: &str) -> (&str, &str) {
    match command.split_once(char::is_whitespace) {
        Some((mnemonic, rest)) => (mnemonic, rest.trim_start()),
        None => (command, ""),
    }
}
