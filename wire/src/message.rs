use crate::bb::ByteBufferMut;
use crate::error::WireError;

/// Implemented by every generated message type.
///
/// In binary mode `marshal_into` writes the tag-aligned wire format and
/// `unmarshal` walks the declared fields in lockstep with the tags found in
/// `data`. In JSON mode both delegate to `serde_json`.
pub trait Message: Sized {
    /// Appends the encoding of `self` to `bb`. Nested messages are written
    /// through this, straight into the enclosing buffer.
    fn marshal_into(&self, bb: &mut ByteBufferMut) -> Result<(), WireError>;

    fn unmarshal(data: &[u8]) -> Result<Self, WireError>;

    fn marshal(&self) -> Result<Vec<u8>, WireError> {
        let mut bb = ByteBufferMut::new();
        self.marshal_into(&mut bb)?;
        Ok(bb.data())
    }
}
