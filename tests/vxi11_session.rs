//! S2–S5: a full VXI-11 session over real loopback sockets, driving
//! the actual listener task exactly as the scope would.

mod common;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use bode_bridge::awg::{AwgDriver, OutputLoad, WaveformType};
use bode_bridge::error::Result;
use bode_bridge::model::AwgIdentity;
use bode_bridge::rpc::framer;
use bode_bridge::rpc::message::{AcceptStatus, MessageBody, ReplyBody, RpcMessage};
use bode_bridge::rpc::xdr::{XdrDecoder, XdrPack};
use bode_bridge::scpi::ScpiDispatcher;
use bode_bridge::vxi11::{self, VXI_CORE_PROG, VXI_CORE_VERS};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock};

const PROC_CREATE_LINK: u32 = 10;
const PROC_DEVICE_WRITE: u32 = 11;
const PROC_DEVICE_READ: u32 = 12;
const PROC_DESTROY_LINK: u32 = 23;

const TEST_PORT_A: u16 = 19009;
const TEST_PORT_B: u16 = 19010;

#[derive(Default)]
struct RecordingDriver {
    calls: Arc<StdMutex<Vec<String>>>,
}
#[async_trait]
impl AwgDriver for RecordingDriver {
    async fn connect(&mut self) -> Result<()> {
        Ok(())
    }
    async fn disconnect(&mut self) -> Result<()> {
        Ok(())
    }
    async fn initialize_channel(&mut self, channel: u8) -> Result<()> {
        self.calls.lock().unwrap().push(format!("init({channel})"));
        Ok(())
    }
    async fn set_output_load(&mut self, channel: u8, load: OutputLoad) -> Result<()> {
        self.calls.lock().unwrap().push(format!("load({channel},{load:?})"));
        Ok(())
    }
    async fn set_output_on(&mut self, channel: u8, enabled: bool) -> Result<()> {
        self.calls.lock().unwrap().push(format!("output_on({channel},{enabled})"));
        Ok(())
    }
    async fn set_waveform_type(&mut self, channel: u8, waveform: WaveformType) -> Result<()> {
        self.calls.lock().unwrap().push(format!("waveform({channel},{waveform})"));
        Ok(())
    }
    async fn set_frequency(&mut self, channel: u8, hertz: f64) -> Result<()> {
        self.calls.lock().unwrap().push(format!("frequency({channel},{hertz})"));
        Ok(())
    }
    async fn set_amplitude(&mut self, channel: u8, volts_pp: f64) -> Result<()> {
        self.calls.lock().unwrap().push(format!("amplitude({channel},{volts_pp})"));
        Ok(())
    }
    async fn set_offset(&mut self, channel: u8, volts: f64) -> Result<()> {
        self.calls.lock().unwrap().push(format!("offset({channel},{volts})"));
        Ok(())
    }
    async fn set_phase(&mut self, channel: u8, degrees: f64) -> Result<()> {
        self.calls.lock().unwrap().push(format!("phase({channel},{degrees})"));
        Ok(())
    }
}

fn unpack_success(reply: &[u8]) -> Vec<u8> {
    let msg = RpcMessage::decode(reply).unwrap();
    match msg.body {
        MessageBody::Reply(ReplyBody::Accepted {
            status: AcceptStatus::Success(data),
            ..
        }) => data,
        other => panic!("unexpected reply: {other:?}"),
    }
}

async fn create_link(stream: &mut TcpStream, xid: u32, device: &str) -> i32 {
    let mut args = vec![];
    1i32.pack_xdr(&mut args);
    false.pack_xdr(&mut args);
    10000u32.pack_xdr(&mut args);
    device.to_string().pack_xdr(&mut args);

    let call = common::call_bytes(xid, VXI_CORE_PROG, VXI_CORE_VERS, PROC_CREATE_LINK, args);
    framer::write_message(stream, &call).await.unwrap();
    let reply = framer::read_message(stream).await.unwrap().unwrap();
    let mut dec = XdrDecoder::new(&unpack_success(&reply));
    let error = dec.u32().unwrap();
    assert_eq!(error, 0, "CREATE_LINK should not error");
    dec.i32().unwrap()
}

async fn device_write(stream: &mut TcpStream, xid: u32, lid: i32, payload: &str) {
    let mut args = vec![];
    lid.pack_xdr(&mut args);
    10000u32.pack_xdr(&mut args);
    10000u32.pack_xdr(&mut args);
    0u32.pack_xdr(&mut args);
    payload.as_bytes().to_vec().pack_xdr(&mut args);

    let call = common::call_bytes(xid, VXI_CORE_PROG, VXI_CORE_VERS, PROC_DEVICE_WRITE, args);
    framer::write_message(stream, &call).await.unwrap();
    let reply = framer::read_message(stream).await.unwrap().unwrap();
    let mut dec = XdrDecoder::new(&unpack_success(&reply));
    assert_eq!(dec.u32().unwrap(), 0, "DEVICE_WRITE should not error");
}

async fn device_read(stream: &mut TcpStream, xid: u32, lid: i32) -> String {
    let mut args = vec![];
    lid.pack_xdr(&mut args);
    1024u32.pack_xdr(&mut args);
    10000u32.pack_xdr(&mut args);
    10000u32.pack_xdr(&mut args);
    0u32.pack_xdr(&mut args);
    0u32.pack_xdr(&mut args);

    let call = common::call_bytes(xid, VXI_CORE_PROG, VXI_CORE_VERS, PROC_DEVICE_READ, args);
    framer::write_message(stream, &call).await.unwrap();
    let reply = framer::read_message(stream).await.unwrap().unwrap();
    let mut dec = XdrDecoder::new(&unpack_success(&reply));
    assert_eq!(dec.u32().unwrap(), 0, "DEVICE_READ should not error");
    let _reason = dec.u32().unwrap();
    String::from_utf8(dec.opaque().unwrap()).unwrap()
}

async fn destroy_link(stream: &mut TcpStream, xid: u32, lid: i32) {
    let mut args = vec![];
    lid.pack_xdr(&mut args);
    let call = common::call_bytes(xid, VXI_CORE_PROG, VXI_CORE_VERS, PROC_DESTROY_LINK, args);
    framer::write_message(stream, &call).await.unwrap();
    let reply = framer::read_message(stream).await.unwrap().unwrap();
    let mut dec = XdrDecoder::new(&unpack_success(&reply));
    assert_eq!(dec.u32().unwrap(), 0, "DESTROY_LINK should not error");
}

#[tokio::test]
async fn full_bode_session_and_port_rotation() {
    let calls = Arc::new(StdMutex::new(vec![]));
    let driver = RecordingDriver { calls: calls.clone() };
    let dispatcher = Arc::new(Mutex::new(ScpiDispatcher::new(
        AwgIdentity::default(),
        Box::new(driver),
    )));
    let active_port = Arc::new(RwLock::new(TEST_PORT_A));

    tokio::spawn(vxi11::serve(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        active_port.clone(),
        (TEST_PORT_A, TEST_PORT_B),
        dispatcher,
    ));

    let addr_a = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), TEST_PORT_A);
    let mut stream = common::connect_retry(addr_a).await;

    // S2: IDN handshake
    let lid = create_link(&mut stream, 1, "inst0").await;
    device_write(&mut stream, 2, lid, "IDN-SGLT-PRI?").await;
    let idn = device_read(&mut stream, 3, lid).await;
    assert!(idn.starts_with("IDN-SGLT-PRI,"));

    // S3: Bode setup write drives the driver in order
    device_write(
        &mut stream,
        4,
        lid,
        "C1:OUTP LOAD,50;BSWV WVTP,SINE,PHSE,0,FRQ,15000,AMP,2,OFST,0;OUTP ON",
    )
    .await;
    {
        let recorded = calls.lock().unwrap().clone();
        assert_eq!(
            recorded,
            vec![
                "init(1)".to_string(),
                "load(1,Fifty)".to_string(),
                "waveform(1,SINE)".to_string(),
                "phase(1,0)".to_string(),
                "frequency(1,15000)".to_string(),
                "amplitude(1,2)".to_string(),
                "offset(1,0)".to_string(),
                "output_on(1,true)".to_string(),
            ]
        );
    }

    // S5: BSWV query reflects the setup above
    device_write(&mut stream, 5, lid, "C1:BSWV?").await;
    let bswv = device_read(&mut stream, 6, lid).await;
    assert!(bswv.starts_with("C1:BSWV WVTP,SINE"));
    assert!(bswv.contains("FRQ,15000"));
    assert!(bswv.contains("AMP,2"));

    // S4: frequency step touches only the frequency
    calls.lock().unwrap().clear();
    device_write(&mut stream, 7, lid, "C1:BSWV FRQ,10").await;
    assert_eq!(calls.lock().unwrap().clone(), vec!["frequency(1,10)".to_string()]);

    destroy_link(&mut stream, 8, lid).await;
    drop(stream);

    // the listener should now have rotated to the other port
    let addr_b = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), TEST_PORT_B);
    let mut stream_b = common::connect_retry(addr_b).await;
    let lid2 = create_link(&mut stream_b, 9, "inst0").await;
    assert_eq!(lid2, 2, "link ids keep incrementing across sessions");
    assert_eq!(*active_port.read().await, TEST_PORT_B);
}
