//! Portmap / Rpcbind responder (RFC 1833), program 100000.
//!
//! Serves exactly one mapping: the VXI-11 Core Channel on whatever TCP
//! port the VXI-11 responder currently has bound. Everything else gets
//! a NULL reply or PROC_UNAVAIL.
//!
//! Grounded on the teacher's `protocol/vxi11/portmap.rs`, which builds a
//! GETPORT *call* (`RpcMapping`, `RpcIpProto`) to query a real portmapper;
//! here the same wire types are decoded instead, and the roles of
//! `PORTMAP_PROG`/`PORTMAP_VERS` are unchanged.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::rpc::{
    framer,
    message::{AcceptStatus, CallBody, RpcMessage},
    xdr::{XdrDecoder, XdrPack},
};
use crate::vxi11::{VXI_CORE_PROG, VXI_CORE_VERS};

pub const PORTMAP_PORT: u16 = 111;
const PORTMAP_PROG: u32 = 100000;

const PROC_NULL: u32 = 0;
const PROC_GETPORT: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum IpProto {
    Tcp,
    Udp,
    Other(u32),
}
impl IpProto {
    fn from_wire(v: u32) -> Self {
        match v {
            6 => Self::Tcp,
            17 => Self::Udp,
            other => Self::Other(other),
        }
    }
}

struct GetPortArgs {
    prog: u32,
    #[allow(dead_code)]
    vers: u32,
    prot: IpProto,
    #[allow(dead_code)]
    port: u32,
}
impl GetPortArgs {
    fn decode(args: &[u8]) -> Result<Self> {
        let mut dec = XdrDecoder::new(args);
        Ok(Self {
            prog: dec.u32()?,
            vers: dec.u32()?,
            prot: IpProto::from_wire(dec.u32()?),
            port: dec.u32()?,
        })
    }
}

/// Shared view of "the port VXI-11 is currently listening on", updated
/// by the VXI-11 responder during the no-connection gap between
/// sessions and read here on every GETPORT.
pub type ActiveVxiPort = Arc<RwLock<u16>>;

/// Resolves a GETPORT call against the live VXI-11 port. Shared,
/// unmodified, between the TCP and UDP Portmap listeners — they are
/// independent transports over the same resolver, never unified.
async fn resolve_getport(active_port: &ActiveVxiPort, call: &CallBody) -> Vec<u8> {
    let args = match GetPortArgs::decode(&call.args) {
        Ok(a) => a,
        Err(e) => {
            log::warn!("malformed GETPORT args: {e}");
            let mut out = vec![];
            0u32.pack_xdr(&mut out);
            return out;
        }
    };

    let port = if args.prog == VXI_CORE_PROG && args.prot == IpProto::Tcp {
        *active_port.read().await
    } else {
        0
    };

    let mut out = vec![];
    (port as u32).pack_xdr(&mut out);
    out
}

fn reply_for_call(call: &CallBody, results: Option<Vec<u8>>) -> RpcMessage {
    if call.prog != PORTMAP_PROG {
        return RpcMessage::reply(0, AcceptStatus::ProgUnavail);
    }
    match call.proc {
        PROC_NULL => RpcMessage::reply(0, AcceptStatus::Success(vec![])),
        PROC_GETPORT => RpcMessage::reply(0, AcceptStatus::Success(results.unwrap_or_default())),
        _ => RpcMessage::reply(0, AcceptStatus::ProcUnavail),
    }
}

async fn handle_call(active_port: &ActiveVxiPort, msg_buf: &[u8]) -> Result<Vec<u8>> {
    let parsed = match RpcMessage::decode(msg_buf) {
        Ok(m) => m,
        Err(e) => {
            log::warn!("malformed Portmap RPC header: {e}");
            return Err(e);
        }
    };
    let xid = parsed.xid;
    let Some(call) = parsed.call_body() else {
        return Err(crate::error::Error::Protocol(
            "Portmap received a non-call message".into(),
        ));
    };

    let results = if call.prog == PORTMAP_PROG && call.proc == PROC_GETPORT {
        Some(resolve_getport(active_port, call).await)
    } else {
        None
    };

    let mut reply = reply_for_call(call, results);
    reply.xid = xid;
    Ok(reply.pack())
}

/// Runs the TCP Portmap listener until the process shuts down. The
/// SDS1000X-E family queries Portmap over TCP.
pub async fn serve_tcp(bind_addr: SocketAddr, active_port: ActiveVxiPort) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .map_err(|e| crate::error::Error::Bind(format!("Portmap TCP {bind_addr}: {e}")))?;
    log::info!("Portmap (TCP) listening on {bind_addr}");

    loop {
        let (stream, peer) = listener.accept().await?;
        log::info!("Incoming connection from {peer} (Portmap/TCP)");
        if let Err(e) = serve_tcp_connection(stream, &active_port).await {
            log::warn!("Portmap/TCP session with {peer} ended: {e}");
        }
    }
}

async fn serve_tcp_connection(mut stream: TcpStream, active_port: &ActiveVxiPort) -> Result<()> {
    loop {
        let Some(msg) = framer::read_message(&mut stream).await? else {
            return Ok(());
        };
        let reply = handle_call(active_port, &msg).await?;
        framer::write_message(&mut stream, &reply).await?;
    }
}

/// Runs the UDP Portmap listener until the process shuts down. The
/// SDS800X-HD family queries Portmap over UDP; binding this listener is
/// gated on the `-udp` startup flag.
pub async fn serve_udp(bind_addr: SocketAddr, active_port: ActiveVxiPort) -> Result<()> {
    let socket = UdpSocket::bind(bind_addr)
        .await
        .map_err(|e| crate::error::Error::Bind(format!("Portmap UDP {bind_addr}: {e}")))?;
    log::info!("Portmap (UDP) listening on {bind_addr}");

    let mut buf = vec![0u8; 4096];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        log::debug!("Portmap/UDP datagram from {peer} ({len} bytes)");
        match handle_call(&active_port, &buf[..len]).await {
            Ok(reply) => {
                if let Err(e) = socket.send_to(&reply, peer).await {
                    log::warn!("failed to send Portmap/UDP reply to {peer}: {e}");
                }
            }
            Err(e) => log::warn!("discarding malformed Portmap/UDP datagram from {peer}: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::message::{CallBody, MessageBody, OpaqueAuth};

    fn call_for(prog: u32, proc: u32, args: Vec<u8>) -> Vec<u8> {
        let call = CallBody {
            rpc_version: crate::rpc::message::RPC_VERSION,
            prog,
            vers: 2,
            proc,
            cred: OpaqueAuth::new_null(),
            verf: OpaqueAuth::new_null(),
            args,
        };
        let mut out = vec![];
        42u32.pack_xdr(&mut out);
        0u32.pack_xdr(&mut out); // MSG_TYPE_CALL
        call.rpc_version.pack_xdr(&mut out);
        call.prog.pack_xdr(&mut out);
        call.vers.pack_xdr(&mut out);
        call.proc.pack_xdr(&mut out);
        call.cred.pack_xdr(&mut out);
        call.verf.pack_xdr(&mut out);
        out.extend(call.args);
        out
    }

    fn unpack_success_u32(buf: &[u8]) -> u32 {
        let msg = RpcMessage::decode(buf).unwrap();
        match msg.body {
            MessageBody::Reply(crate::rpc::message::ReplyBody::Accepted {
                status: AcceptStatus::Success(data),
                ..
            }) => {
                let mut dec = XdrDecoder::new(&data);
                dec.u32().unwrap()
            }
            other => panic!("not a success reply: {other:?}"),
        }
    }

    #[tokio::test]
    async fn getport_tcp_returns_live_vxi11_port() {
        let active_port: ActiveVxiPort = Arc::new(RwLock::new(9009));

        let mut args = vec![];
        VXI_CORE_PROG.pack_xdr(&mut args);
        VXI_CORE_VERS.pack_xdr(&mut args);
        6u32.pack_xdr(&mut args); // TCP
        0u32.pack_xdr(&mut args);

        let call = call_for(PORTMAP_PROG, PROC_GETPORT, args);
        let reply = handle_call(&active_port, &call).await.unwrap();
        assert_eq!(unpack_success_u32(&reply), 9009);
    }

    #[tokio::test]
    async fn getport_udp_returns_zero() {
        let active_port: ActiveVxiPort = Arc::new(RwLock::new(9009));

        let mut args = vec![];
        VXI_CORE_PROG.pack_xdr(&mut args);
        VXI_CORE_VERS.pack_xdr(&mut args);
        17u32.pack_xdr(&mut args); // UDP
        0u32.pack_xdr(&mut args);

        let call = call_for(PORTMAP_PROG, PROC_GETPORT, args);
        let reply = handle_call(&active_port, &call).await.unwrap();
        assert_eq!(unpack_success_u32(&reply), 0);
    }

    #[tokio::test]
    async fn unknown_procedure_is_proc_unavail() {
        let active_port: ActiveVxiPort = Arc::new(RwLock::new(9009));
        let call = call_for(PORTMAP_PROG, 99, vec![]);
        let reply = handle_call(&active_port, &call).await.unwrap();
        let msg = RpcMessage::decode(&reply).unwrap();
        assert!(matches!(
            msg.body,
            MessageBody::Reply(crate::rpc::message::ReplyBody::Accepted {
                status: AcceptStatus::ProcUnavail,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn port_reflects_rotation_update() {
        let active_port: ActiveVxiPort = Arc::new(RwLock::new(9009));
        *active_port.write().await = 9010;

        let mut args = vec![];
        VXI_CORE_PROG.pack_xdr(&mut args);
        VXI_CORE_VERS.pack_xdr(&mut args);
        6u32.pack_xdr(&mut args);
        0u32.pack_xdr(&mut args);

        let call = call_for(PORTMAP_PROG, PROC_GETPORT, args);
        let reply = handle_call(&active_port, &call).await.unwrap();
        assert_eq!(unpack_success_u32(&reply), 9010);
    }
}
