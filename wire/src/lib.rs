//! Runtime support for code generated by `dgen-compiler`.
//!
//! ```
//! use dgen_wire::*;
//!
//! let mut bb = ByteBufferMut::new();
//! bb.write_tag(1);
//! bb.write_string("ann").unwrap();
//! let data = bb.data();
//!
//! let mut bb = ByteBuffer::new(&data);
//! assert_eq!(bb.read_tag(), Some(1));
//! assert_eq!(bb.read_string().unwrap(), "ann");
//! assert_eq!(bb.read_tag(), None);
//! ```

pub mod bb;
pub mod error;
pub mod message;

pub use bb::*;
pub use error::WireError;
pub use message::Message;
