use std::str;

use crate::error::WireError;

/// A dgen byte buffer meant for reading.
///
/// Every integer is fixed-width little-endian and strings carry a 4-byte
/// signed length prefix. There is no variable-length encoding.
///
/// Example usage:
///
/// ```
/// let mut bb = dgen_wire::ByteBuffer::new(&[1, 3, 0, 0, 0, 97, 110, 110]);
/// assert_eq!(bb.read_uint8().unwrap(), 1);
/// assert_eq!(bb.read_string().unwrap(), "ann");
/// ```
///
pub struct ByteBuffer<'a> {
    data: &'a [u8],
    index: usize,
}

impl<'a> ByteBuffer<'a> {
    /// Create a new ByteBuffer that wraps the provided byte slice. The lifetime
    /// of the returned ByteBuffer must not outlive the lifetime of the byte
    /// slice.
    pub fn new(data: &'a [u8]) -> ByteBuffer<'a> {
        ByteBuffer { data, index: 0 }
    }

    /// Retrieves the underlying byte slice.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Retrieves the current index into the underlying byte slice. This starts
    /// off as 0 and ends up as `self.data().len()` when everything has been
    /// read.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Everything from the current index to the end of the buffer. The index
    /// is not moved.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.index..]
    }

    /// True once every byte has been read.
    pub fn is_empty(&self) -> bool {
        self.index >= self.data.len()
    }

    /// Advance the index by `len` bytes without looking at them.
    pub fn skip(&mut self, len: usize) -> Result<(), WireError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Try to read a byte starting at the current index.
    pub fn read_byte(&mut self) -> Result<u8, WireError> {
        match self.data.get(self.index) {
            Some(&value) => {
                self.index += 1;
                Ok(value)
            }
            None => Err(self.eof(1)),
        }
    }

    /// Read a field tag. Running out of input is not an error here: it means
    /// there is no further tag, which the merge-join decoder treats as a tag
    /// that matches nothing.
    pub fn read_tag(&mut self) -> Option<u8> {
        self.read_byte().ok()
    }

    /// Try to read `len` bytes starting at the current index.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        match self.index.checked_add(len) {
            Some(end) if end <= self.data.len() => {
                let value = &self.data[self.index..end];
                self.index = end;
                Ok(value)
            }
            _ => Err(self.eof(len)),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_uint8(&mut self) -> Result<u8, WireError> {
        self.read_byte()
    }

    pub fn read_uint16(&mut self) -> Result<u16, WireError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_uint32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_uint64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_int8(&mut self) -> Result<i8, WireError> {
        Ok(i8::from_le_bytes(self.read_array()?))
    }

    pub fn read_int16(&mut self) -> Result<i16, WireError> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_int32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_int64(&mut self) -> Result<i64, WireError> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    pub fn read_float32(&mut self) -> Result<f32, WireError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_float64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_le_bytes(self.read_array()?))
    }

    /// Read a 4-byte signed length prefix as used by strings, lists and maps.
    /// Negative lengths are rejected.
    pub fn read_len(&mut self) -> Result<usize, WireError> {
        let len = self.read_int32()?;
        usize::try_from(len).map_err(|_| WireError::InvalidLength(i64::from(len)))
    }

    /// Try to read a length-prefixed UTF-8 string starting at the current
    /// index. The returned slice aliases the underlying memory.
    pub fn read_string(&mut self) -> Result<&'a str, WireError> {
        let len = self.read_len()?;
        let bytes = self.read_bytes(len)?;
        Ok(str::from_utf8(bytes)?)
    }

    fn eof(&self, needed: usize) -> WireError {
        WireError::UnexpectedEof {
            offset: self.index,
            needed,
        }
    }
}

#[test]
fn read_byte() {
    let read = |bytes| ByteBuffer::new(bytes).read_byte();
    assert!(read(&[]).is_err());
    assert_eq!(read(&[0]).unwrap(), 0);
    assert_eq!(read(&[1]).unwrap(), 1);
    assert_eq!(read(&[254]).unwrap(), 254);
    assert_eq!(read(&[255]).unwrap(), 255);
}

#[test]
fn read_bytes() {
    let mut bb = ByteBuffer::new(&[1, 2, 3, 4, 5]);
    assert_eq!(bb.read_bytes(3).unwrap(), &[1, 2, 3]);
    assert_eq!(bb.read_bytes(2).unwrap(), &[4, 5]);
    assert!(matches!(
        bb.read_bytes(1),
        Err(WireError::UnexpectedEof { offset: 5, needed: 1 })
    ));
    assert_eq!(ByteBuffer::new(&[]).read_bytes(0).unwrap(), &[] as &[u8]);
}

#[test]
fn read_fixed_width_integers() {
    assert_eq!(ByteBuffer::new(&[0x34, 0x12]).read_uint16().unwrap(), 0x1234);
    assert_eq!(ByteBuffer::new(&[0xff, 0xff]).read_int16().unwrap(), -1);
    assert_eq!(
        ByteBuffer::new(&[0x78, 0x56, 0x34, 0x12]).read_uint32().unwrap(),
        0x1234_5678
    );
    assert_eq!(
        ByteBuffer::new(&[0xfe, 0xff, 0xff, 0xff]).read_int32().unwrap(),
        -2
    );
    assert_eq!(
        ByteBuffer::new(&[1, 0, 0, 0, 0, 0, 0, 0x80]).read_uint64().unwrap(),
        0x8000_0000_0000_0001
    );
    assert_eq!(
        ByteBuffer::new(&[0, 0, 0, 0, 0, 0, 0, 0x80]).read_int64().unwrap(),
        i64::MIN
    );
    assert_eq!(ByteBuffer::new(&[0x80]).read_int8().unwrap(), -128);
    assert!(ByteBuffer::new(&[1, 2, 3]).read_int32().is_err());
}

#[test]
fn read_floats() {
    assert_eq!(
        ByteBuffer::new(&1.5f32.to_le_bytes()).read_float32().unwrap(),
        1.5
    );
    assert_eq!(
        ByteBuffer::new(&(-0.25f64).to_le_bytes()).read_float64().unwrap(),
        -0.25
    );
}

#[test]
fn read_string() {
    let read = |bytes| ByteBuffer::new(bytes).read_string();
    assert!(read(&[]).is_err());
    assert_eq!(read(&[0, 0, 0, 0]).unwrap(), "");
    assert_eq!(read(&[3, 0, 0, 0, 97, 98, 99]).unwrap(), "abc");
    assert_eq!(read(&[4, 0, 0, 0, 240, 159, 141, 149]).unwrap(), "🍕");
    assert!(matches!(
        read(&[4, 0, 0, 0, 97]),
        Err(WireError::UnexpectedEof { .. })
    ));
    assert!(matches!(
        read(&[0xff, 0xff, 0xff, 0xff]),
        Err(WireError::InvalidLength(-1))
    ));
    assert!(matches!(
        read(&[2, 0, 0, 0, 0xc3, 0x28]),
        Err(WireError::InvalidUtf8(_))
    ));
}

#[test]
fn read_tag_and_skip() {
    let mut bb = ByteBuffer::new(&[7, 1, 2, 3]);
    assert_eq!(bb.read_tag(), Some(7));
    assert_eq!(bb.remaining(), &[1, 2, 3]);
    bb.skip(2).unwrap();
    assert_eq!(bb.index(), 3);
    assert!(bb.skip(2).is_err());
    assert_eq!(bb.read_tag(), Some(3));
    assert!(bb.is_empty());
    assert_eq!(bb.read_tag(), None);
}

/// A dgen byte buffer meant for writing.
///
/// Example usage:
///
/// ```
/// let mut bb = dgen_wire::ByteBufferMut::new();
/// bb.write_uint8(1);
/// bb.write_string("ann").unwrap();
/// assert_eq!(bb.data(), [1, 3, 0, 0, 0, 97, 110, 110]);
/// ```
///
#[derive(Debug, Default)]
pub struct ByteBufferMut {
    data: Vec<u8>,
}

impl ByteBufferMut {
    /// Creates an empty ByteBufferMut ready for writing.
    pub fn new() -> ByteBufferMut {
        ByteBufferMut { data: vec![] }
    }

    /// Consumes this buffer and returns the underlying backing store. Use this
    /// to get the data out when you're done writing to the buffer.
    pub fn data(self) -> Vec<u8> {
        self.data
    }

    /// Returns the number of bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write a byte to the end of the buffer.
    pub fn write_byte(&mut self, value: u8) {
        self.data.push(value);
    }

    /// Write a raw byte slice to the end of the buffer.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.data.extend_from_slice(value);
    }

    /// Write a field tag.
    pub fn write_tag(&mut self, seq: u8) {
        self.write_byte(seq);
    }

    pub fn write_uint8(&mut self, value: u8) {
        self.write_byte(value);
    }

    pub fn write_uint16(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_uint32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_uint64(&mut self, value: u64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_int8(&mut self, value: i8) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_int16(&mut self, value: i16) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_int32(&mut self, value: i32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_int64(&mut self, value: i64) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_float32(&mut self, value: f32) {
        self.write_bytes(&value.to_le_bytes());
    }

    pub fn write_float64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Write a 4-byte signed length prefix. Lengths that do not fit in an
    /// `i32` cannot be represented on the wire.
    pub fn write_len(&mut self, len: usize) -> Result<(), WireError> {
        let len = i32::try_from(len).map_err(|_| WireError::InvalidLength(len as i64))?;
        self.write_int32(len);
        Ok(())
    }

    /// Write a length-prefixed UTF-8 string to the end of the buffer.
    pub fn write_string(&mut self, value: &str) -> Result<(), WireError> {
        self.write_len(value.len())?;
        self.write_bytes(value.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
fn write_once(cb: fn(&mut ByteBufferMut)) -> Vec<u8> {
    let mut bb = ByteBufferMut::new();
    cb(&mut bb);
    bb.data()
}

#[test]
fn write_fixed_width_integers() {
    assert_eq!(write_once(|bb| bb.write_uint8(255)), [255]);
    assert_eq!(write_once(|bb| bb.write_int8(-1)), [255]);
    assert_eq!(write_once(|bb| bb.write_uint16(0x1234)), [0x34, 0x12]);
    assert_eq!(write_once(|bb| bb.write_int16(-2)), [0xfe, 0xff]);
    assert_eq!(write_once(|bb| bb.write_uint32(1)), [1, 0, 0, 0]);
    assert_eq!(write_once(|bb| bb.write_int32(-1)), [0xff, 0xff, 0xff, 0xff]);
    assert_eq!(
        write_once(|bb| bb.write_uint64(0x0102_0304_0506_0708)),
        [8, 7, 6, 5, 4, 3, 2, 1]
    );
    assert_eq!(
        write_once(|bb| bb.write_int64(i64::MIN)),
        [0, 0, 0, 0, 0, 0, 0, 0x80]
    );
}

#[test]
fn write_floats() {
    assert_eq!(write_once(|bb| bb.write_float32(1.5)), 1.5f32.to_le_bytes());
    assert_eq!(
        write_once(|bb| bb.write_float64(-0.25)),
        (-0.25f64).to_le_bytes()
    );
}

#[test]
fn write_string() {
    assert_eq!(write_once(|bb| bb.write_string("").unwrap()), [0, 0, 0, 0]);
    assert_eq!(
        write_once(|bb| bb.write_string("abc").unwrap()),
        [3, 0, 0, 0, 97, 98, 99]
    );
    assert_eq!(
        write_once(|bb| bb.write_string("🍕").unwrap()),
        [4, 0, 0, 0, 240, 159, 141, 149]
    );
}

#[test]
fn write_sequence() {
    let mut bb = ByteBufferMut::new();
    bb.write_tag(1);
    bb.write_string("ann").unwrap();
    bb.write_tag(2);
    bb.write_int32(30);
    assert_eq!(bb.len(), 13);
    assert_eq!(
        bb.data(),
        [1, 3, 0, 0, 0, 97, 110, 110, 2, 30, 0, 0, 0]
    );
}
