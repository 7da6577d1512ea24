//! Shared helpers for the integration tests: building raw ONC RPC call
//! bytes and connecting to a listener that may still be mid-bind.

use std::net::SocketAddr;
use std::time::Duration;

use bode_bridge::rpc::message::{CallBody, OpaqueAuth, RPC_VERSION};
use bode_bridge::rpc::xdr::XdrPack;
use tokio::net::TcpStream;

#[allow(dead_code)]
pub fn call_bytes(xid: u32, prog: u32, vers: u32, proc: u32, args: Vec<u8>) -> Vec<u8> {
    let call = CallBody {
        rpc_version: RPC_VERSION,
        prog,
        vers,
        proc,
        cred: OpaqueAuth::new_null(),
        verf: OpaqueAuth::new_null(),
        args,
    };
    let mut out = vec![];
    xid.pack_xdr(&mut out);
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

/// Connects to `addr`, retrying for a bit since the background listener
/// task may not have finished binding yet.
#[allow(dead_code)]
pub async fn connect_retry(addr: SocketAddr) -> TcpStream {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return stream,
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
            Err(e) => panic!("could not connect to {addr}: {e}"),
        }
    }
}
