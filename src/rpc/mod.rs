//! ONC RPC wire layer: XDR primitives, message framing, and the
//! record-marking framer shared by the Portmap and VXI-11 responders.

pub mod framer;
pub mod message;
pub mod xdr;
