//! VXI-11 Core Channel responder (TCG VXI-11 Rev 1.0), program 395183
//! version 1.
//!
//! Accepts one TCP connection at a time, walks it through
//! CREATE_LINK → DEVICE_WRITE/DEVICE_READ → DESTROY_LINK, and on every
//! connection close rebinds its listening socket to the other half of
//! a two-port rotation — the quirk a Siglent scope needs to reconnect
//! between sweep points.
//!
//! Grounded on the teacher's `protocol/vxi11/rpc.rs` struct layout
//! (`RpcRequestCreateDeviceLink`, `RpcResponseDeviceWrite`,
//! `RpcDeviceErrorCode`...) and the session shape of
//! `protocol/vxi11/mod.rs` (`VxiClientLink` becomes [`VxiSession`]),
//! with the call/reply direction reversed throughout.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{Error, Result};
use crate::portmap::ActiveVxiPort;
use crate::rpc::{
    framer,
    message::{AcceptStatus, CallBody, RpcMessage},
    xdr::{XdrDecoder, XdrPack},
};
use crate::scpi::ScpiDispatcher;

pub mod link;
use link::{DeviceErrorCode, VxiLink};

pub const VXI_CORE_PROG: u32 = 395183;
pub const VXI_CORE_VERS: u32 = 1;

const PROC_CREATE_LINK: u32 = 10;
const PROC_DEVICE_WRITE: u32 = 11;
const PROC_DEVICE_READ: u32 = 12;
const PROC_DESTROY_LINK: u32 = 23;
/// DEVICE_ABORT/DEVICE_READ_STB/DEVICE_TRIGGER/DEVICE_CLEAR/DEVICE_ERROR/
/// DEVICE_LOCAL/DEVICE_LOCK/DEVICE_UNLOCK/DEVICE_ENABLE_SRQ/DEVICE_DOCMD:
/// replied to safely (bare error=0) but never meaningfully implemented,
/// since nothing in a Bode sweep issues them for effect.
const TOLERATED_PROCS: &[u32] = &[13, 14, 15, 16, 17, 18, 19, 20, 21, 22];

/// `reason` bit for DEVICE_READ: the END indicator was seen. The scope
/// only ever reads one whole SCPI reply at a time, so every read this
/// responder answers is "the end" by construction.
const READ_REASON_END: u32 = 0x04;

const MAX_RECV_SIZE: u32 = 1024 * 1024;

fn pack_device_error_reply(xid: u32, error: DeviceErrorCode) -> Vec<u8> {
    let mut results = vec![];
    error.wire_value().pack_xdr(&mut results);
    RpcMessage::reply(xid, AcceptStatus::Success(results)).pack()
}

struct CreateLinkArgs {
    client_id: i32,
    #[allow(dead_code)]
    lock_device: bool,
    #[allow(dead_code)]
    lock_timeout: u32,
    device: String,
}
impl CreateLinkArgs {
    fn decode(args: &[u8]) -> Result<Self> {
        let mut dec = XdrDecoder::new(args);
        Ok(Self {
            client_id: dec.i32()?,
            lock_device: dec.bool()?,
            lock_timeout: dec.u32()?,
            device: dec.string()?,
        })
    }
}

struct DeviceWriteArgs {
    lid: i32,
    #[allow(dead_code)]
    io_timeout: u32,
    #[allow(dead_code)]
    lock_timeout: u32,
    #[allow(dead_code)]
    flags: u32,
    data: Vec<u8>,
}
impl DeviceWriteArgs {
    fn decode(args: &[u8]) -> Result<Self> {
        let mut dec = XdrDecoder::new(args);
        Ok(Self {
            lid: dec.i32()?,
            io_timeout: dec.u32()?,
            lock_timeout: dec.u32()?,
            flags: dec.u32()?,
            data: dec.opaque()?,
        })
    }
}

struct DeviceReadArgs {
    lid: i32,
    #[allow(dead_code)]
    request_size: u32,
    #[allow(dead_code)]
    io_timeout: u32,
    #[allow(dead_code)]
    lock_timeout: u32,
    #[allow(dead_code)]
    flags: u32,
    #[allow(dead_code)]
    termchr: u32,
}
impl DeviceReadArgs {
    fn decode(args: &[u8]) -> Result<Self> {
        let mut dec = XdrDecoder::new(args);
        Ok(Self {
            lid: dec.i32()?,
            request_size: dec.u32()?,
            io_timeout: dec.u32()?,
            lock_timeout: dec.u32()?,
            flags: dec.u32()?,
            termchr: dec.u32()?,
        })
    }
}

struct DestroyLinkArgs {
    #[allow(dead_code)]
    lid: i32,
}
impl DestroyLinkArgs {
    fn decode(args: &[u8]) -> Result<Self> {
        let mut dec = XdrDecoder::new(args);
        Ok(Self { lid: dec.i32()? })
    }
}

/// Outcome of handling one RPC call within a session.
enum SessionAction {
    /// Reply was sent; keep reading from this connection.
    Continue(Vec<u8>),
    /// Reply was sent; the connection is now done (DESTROY_LINK, or a
    /// malformed procedure body that earned GARBAGE_ARGS).
    Close(Vec<u8>),
}

/// State for one accepted TCP connection, from its first CREATE_LINK
/// through DESTROY_LINK or a transport error.
struct VxiSession {
    link: Option<VxiLink>,
    next_link_id: i32,
    dispatcher: Arc<AsyncMutex<ScpiDispatcher>>,
}
impl VxiSession {
    fn new(dispatcher: Arc<AsyncMutex<ScpiDispatcher>>) -> Self {
        Self {
            link: None,
            next_link_id: 1,
            dispatcher,
        }
    }

    async fn run(&mut self, mut stream: TcpStream) -> Result<()> {
        loop {
            let Some(msg) = framer::read_message(&mut stream).await? else {
                return Ok(());
            };
            match self.handle_message(&msg).await? {
                SessionAction::Continue(reply) => {
                    framer::write_message(&mut stream, &reply).await?;
                }
                SessionAction::Close(reply) => {
                    framer::write_message(&mut stream, &reply).await?;
                    return Ok(());
                }
            }
        }
    }

    async fn handle_message(&mut self, msg_buf: &[u8]) -> Result<SessionAction> {
        let parsed = RpcMessage::decode(msg_buf)?;
        let xid = parsed.xid;
        let Some(call) = parsed.call_body() else {
            return Err(Error::Protocol("VXI-11 received a non-call message".into()));
        };
        log::debug!("VXI-11 call: prog={} proc={}", call.prog, call.proc);

        if call.prog != VXI_CORE_PROG {
            return Ok(SessionAction::Continue(
                RpcMessage::reply(xid, AcceptStatus::ProgUnavail).pack(),
            ));
        }

        match call.proc {
            PROC_CREATE_LINK => Ok(self.handle_create_link(xid, call)),
            PROC_DEVICE_WRITE => Ok(self.handle_device_write(xid, call).await),
            PROC_DEVICE_READ => Ok(self.handle_device_read(xid, call)),
            PROC_DESTROY_LINK => Ok(self.handle_destroy_link(xid, call)),
            p if TOLERATED_PROCS.contains(&p) => {
                Ok(SessionAction::Continue(pack_device_error_reply(xid, DeviceErrorCode::NoError)))
            }
            _ => Ok(SessionAction::Continue(
                RpcMessage::reply(xid, AcceptStatus::ProcUnavail).pack(),
            )),
        }
    }

    fn handle_create_link(&mut self, xid: u32, call: &CallBody) -> SessionAction {
        let args = match CreateLinkArgs::decode(&call.args) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("malformed CREATE_LINK args: {e}");
                return SessionAction::Close(
                    RpcMessage::reply(xid, AcceptStatus::GarbageArgs).pack(),
                );
            }
        };

        if args.device.is_empty() {
            log::warn!("CREATE_LINK with empty device name");
            return SessionAction::Close(
                RpcMessage::reply(xid, AcceptStatus::GarbageArgs).pack(),
            );
        }

        let lid = self.next_link_id;
        self.next_link_id += 1;
        log::debug!("CREATE_LINK: device={:?} lid={lid}", args.device);
        self.link = Some(VxiLink::new(lid, args.client_id, args.device));

        let mut results = vec![];
        DeviceErrorCode::NoError.wire_value().pack_xdr(&mut results);
        lid.pack_xdr(&mut results);
        0u32.pack_xdr(&mut results); // abort_port: never used
        MAX_RECV_SIZE.pack_xdr(&mut results);
        SessionAction::Continue(RpcMessage::reply(xid, AcceptStatus::Success(results)).pack())
    }

    async fn handle_device_write(&mut self, xid: u32, call: &CallBody) -> SessionAction {
        let args = match DeviceWriteArgs::decode(&call.args) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("malformed DEVICE_WRITE args: {e}");
                return SessionAction::Close(
                    RpcMessage::reply(xid, AcceptStatus::GarbageArgs).pack(),
                );
            }
        };

        let Some(link) = &mut self.link else {
            log::warn!("DEVICE_WRITE with no active link (lid={})", args.lid);
            return SessionAction::Continue(pack_device_error_reply(
                xid,
                DeviceErrorCode::InvalidLinkIdentifier,
            ));
        };

        let payload = String::from_utf8_lossy(&args.data)
            .trim_end_matches(['\r', '\n', ' '])
            .to_string();
        log::debug!("DEVICE_WRITE: {payload:?}");

        let reply = self.dispatcher.lock().await.dispatch(&payload).await;
        if let Some(reply) = reply {
            self.link.as_mut().unwrap().pending_response = Some(reply.into_bytes());
        }

        let mut results = vec![];
        DeviceErrorCode::NoError.wire_value().pack_xdr(&mut results);
        (args.data.len() as u32).pack_xdr(&mut results);
        SessionAction::Continue(RpcMessage::reply(xid, AcceptStatus::Success(results)).pack())
    }

    fn handle_device_read(&mut self, xid: u32, call: &CallBody) -> SessionAction {
        let args = match DeviceReadArgs::decode(&call.args) {
            Ok(a) => a,
            Err(e) => {
                log::warn!("malformed DEVICE_READ args: {e}");
                return SessionAction::Close(
                    RpcMessage::reply(xid, AcceptStatus::GarbageArgs).pack(),
                );
            }
        };

        let Some(link) = &mut self.link else {
            log::warn!("DEVICE_READ with no active link (lid={})", args.lid);
            return SessionAction::Continue(pack_device_error_reply(
                xid,
                DeviceErrorCode::InvalidLinkIdentifier,
            ));
        };
        let data = link.take_pending_response();
        log::debug!("DEVICE_READ: {:?}", String::from_utf8_lossy(&data));

        let mut results = vec![];
        DeviceErrorCode::NoError.wire_value().pack_xdr(&mut results);
        READ_REASON_END.pack_xdr(&mut results);
        data.pack_xdr(&mut results);
        SessionAction::Continue(RpcMessage::reply(xid, AcceptStatus::Success(results)).pack())
    }

    fn handle_destroy_link(&mut self, xid: u32, call: &CallBody) -> SessionAction {
        if let Err(e) = DestroyLinkArgs::decode(&call.args) {
            log::warn!("malformed DESTROY_LINK args: {e}");
            return SessionAction::Close(RpcMessage::reply(xid, AcceptStatus::GarbageArgs).pack());
        }
        self.link = None;
        SessionAction::Close(pack_device_error_reply(xid, DeviceErrorCode::NoError))
    }
}

/// Runs the VXI-11 Core Channel listener for the life of the process.
/// Binds `active_port`'s current value, serves one connection to
/// completion, then flips to the other half of `rotation` before
/// binding again — the order Portmap is guaranteed to observe it in.
pub async fn serve(
    listen_ip: IpAddr,
    active_port: ActiveVxiPort,
    rotation: (u16, u16),
    dispatcher: Arc<AsyncMutex<ScpiDispatcher>>,
) -> Result<()> {
    loop {
        let port = *active_port.read().await;
        let bind_addr = SocketAddr::new(listen_ip, port);
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| Error::Bind(format!("VXI-11 TCP {bind_addr}: {e}")))?;
        log::info!("VXI-11 listening on {bind_addr}");

        let (stream, peer) = listener.accept().await?;
        log::info!("Incoming connection from {peer} (VXI-11)");

        let mut session = VxiSession::new(dispatcher.clone());
        if let Err(e) = session.run(stream).await {
            log::warn!("VXI-11 session with {peer} ended: {e}");
        }
        drop(listener);

        let next = if port == rotation.0 { rotation.1 } else { rotation.0 };
        *active_port.write().await = next;
        log::info!("VXI-11 moving to TCP port {next}");
    }
}
