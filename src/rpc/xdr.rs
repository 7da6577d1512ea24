//! External Data Representation (XDR), as defined by RFC4506.
//!
//! Packing (`XdrPack`) is carried over verbatim from the client-side
//! codec this is grounded on. Decoding is new: the client this is
//! grounded on only ever decoded *replies* out of a buffer it owned and
//! could drain destructively; a server must decode *calls* out of a
//! borrowed buffer without consuming fragments it hasn't reached yet,
//! so decoding here is a cursor over a borrowed slice instead.

use crate::error::{Error, Result};

pub trait XdrPack {
    /// Consume self, appending XDR representation into out
    fn pack_xdr(self, out: &mut Vec<u8>);
}

impl XdrPack for u32 {
    fn pack_xdr(self, out: &mut Vec<u8>) {
        out.extend(self.to_be_bytes());
    }
}

impl XdrPack for i32 {
    fn pack_xdr(self, out: &mut Vec<u8>) {
        out.extend(self.to_be_bytes());
    }
}

impl XdrPack for bool {
    fn pack_xdr(self, out: &mut Vec<u8>) {
        (self as u32).pack_xdr(out);
    }
}

impl XdrPack for Vec<u8> {
    /// This only applies to "opaque" data buffers that are prefixed by the size
    fn pack_xdr(self, out: &mut Vec<u8>) {
        let len = self.len();
        (self.len() as u32).pack_xdr(out);
        out.extend(self);
        /* Must be padded to a multiple of 4 bytes */
        if !len.is_multiple_of(4) {
            for _ in 0..(4 - (len % 4)) {
                out.push(0);
            }
        }
    }
}

impl XdrPack for String {
    fn pack_xdr(self, out: &mut Vec<u8>) {
        self.into_bytes().pack_xdr(out);
    }
}

/// Sanity bound on a single decoded opaque/string payload. Real VXI-11
/// traffic never approaches this; it exists to fail fast on garbage
/// length fields rather than attempt a multi-gigabyte allocation.
const MAX_OPAQUE_LEN: usize = 16 * 1024 * 1024;

/// Cursor-based XDR decoder over a borrowed buffer.
pub struct XdrDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}
impl<'a> XdrDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or_else(|| Error::Decode("length overflow".into()))?;
        if end > self.buf.len() {
            return Err(Error::Decode(format!(
                "expected {len} more bytes, only {} remain",
                self.buf.len() - self.pos
            )));
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub fn u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn i32(&mut self) -> Result<i32> {
        let bytes: [u8; 4] = self.take(4)?.try_into().unwrap();
        Ok(i32::from_be_bytes(bytes))
    }

    pub fn bool(&mut self) -> Result<bool> {
        Ok(self.u32()? != 0)
    }

    /// Variable-length opaque data: 4-byte length prefix, payload,
    /// zero-padded to a 4-byte boundary.
    pub fn opaque(&mut self) -> Result<Vec<u8>> {
        let len = self.u32()? as usize;
        if len > MAX_OPAQUE_LEN {
            return Err(Error::Decode(format!(
                "opaque length {len} exceeds sanity bound"
            )));
        }
        let data = self.take(len)?.to_vec();
        let padding = if len.is_multiple_of(4) { 0 } else { 4 - (len % 4) };
        self.take(padding)?;
        Ok(data)
    }

    pub fn string(&mut self) -> Result<String> {
        let bytes = self.opaque()?;
        String::from_utf8(bytes).map_err(|e| Error::Decode(format!("invalid utf-8 string: {e}")))
    }

    /// Bytes remaining to be decoded.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Consumes and returns every remaining byte, unprefixed. Used for
    /// the procedure-specific payload of a `CallBody`/`AcceptStatus`,
    /// which is not itself length-prefixed on the wire — the enclosing
    /// record-marking fragment already carries the total length.
    pub fn rest(&mut self) -> Vec<u8> {
        let remaining = self.remaining();
        self.take(remaining).unwrap().to_vec()
    }

    /// Returns an error if the decoder hasn't consumed the whole buffer,
    /// i.e. trailing garbage was appended to an otherwise-valid call.
    pub fn expect_exhausted(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::Decode(format!(
                "{} trailing bytes after decoding expected fields",
                self.remaining()
            )));
        }
        Ok(())
    }
}
