//! S1/S6: Portmap GETPORT over TCP and UDP.

mod common;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use bode_bridge::portmap;
use bode_bridge::rpc::framer;
use bode_bridge::rpc::message::{AcceptStatus, MessageBody, ReplyBody, RpcMessage};
use bode_bridge::rpc::xdr::{XdrDecoder, XdrPack};
use bode_bridge::vxi11::{VXI_CORE_PROG, VXI_CORE_VERS};
use tokio::net::UdpSocket;
use tokio::sync::RwLock;

const PORTMAP_PROG: u32 = 100000;
const PROC_GETPORT: u32 = 3;

fn getport_args(proto: u32) -> Vec<u8> {
    let mut args = vec![];
    VXI_CORE_PROG.pack_xdr(&mut args);
    VXI_CORE_VERS.pack_xdr(&mut args);
    proto.pack_xdr(&mut args);
    0u32.pack_xdr(&mut args);
    args
}

#[tokio::test]
async fn s1_getport_tcp_returns_initial_vxi11_port() {
    let active_port = Arc::new(RwLock::new(9009u16));
    let bind_addr: SocketAddr = "127.0.0.1:18111".parse().unwrap();

    tokio::spawn(portmap::serve_tcp(bind_addr, active_port.clone()));

    let mut stream = common::connect_retry(bind_addr).await;
    let call = common::call_bytes(1, PORTMAP_PROG, 2, PROC_GETPORT, getport_args(6));
    framer::write_message(&mut stream, &call).await.unwrap();
    let reply = framer::read_message(&mut stream).await.unwrap().unwrap();

    let msg = RpcMessage::decode(&reply).unwrap();
    match msg.body {
        MessageBody::Reply(ReplyBody::Accepted {
            status: AcceptStatus::Success(data),
            ..
        }) => {
            let port = XdrDecoder::new(&data).u32().unwrap();
            assert_eq!(port, 9009);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}

#[tokio::test]
async fn s6_getport_udp_reaches_the_same_answer_as_tcp() {
    let active_port = Arc::new(RwLock::new(9009u16));
    let bind_addr: SocketAddr = "127.0.0.1:18112".parse().unwrap();

    tokio::spawn(portmap::serve_udp(bind_addr, active_port.clone()));
    // give the listener a moment to bind before the first datagram
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let socket = UdpSocket::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0))
        .await
        .unwrap();
    let call = common::call_bytes(2, PORTMAP_PROG, 2, PROC_GETPORT, getport_args(6));
    socket.send_to(&call, bind_addr).await.unwrap();

    let mut buf = vec![0u8; 4096];
    let (len, _) = tokio::time::timeout(std::time::Duration::from_secs(1), socket.recv_from(&mut buf))
        .await
        .expect("no UDP reply received")
        .unwrap();

    let msg = RpcMessage::decode(&buf[..len]).unwrap();
    match msg.body {
        MessageBody::Reply(ReplyBody::Accepted {
            status: AcceptStatus::Success(data),
            ..
        }) => {
            let port = XdrDecoder::new(&data).u32().unwrap();
            assert_eq!(port, 9009);
        }
        other => panic!("unexpected reply: {other:?}"),
    }
}
