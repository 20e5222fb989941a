//! In-memory, capacity-bounded history storage
//!
//! Nothing here outlives the process: all measurement history is capped and
//! dropped on restart.

pub mod ring_buffer;

pub use ring_buffer::RingBuffer;
