use crate::error::CodecError;

/// Default chunk size for a freshly constructed [`ByteBuffer`], matching
/// `CodecConfig::output_chunk_size`'s documented default.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Append-only byte sink. Implementors never fail for lack of capacity.
pub trait Output {
	fn put_byte(&mut self, byte: u8);
	fn put_bytes(&mut self, src: &[u8]);
	fn length(&self) -> usize;
}

/// A growable byte sink backed by a singly-linked list of fixed-size chunks,
/// the same chunked-growth strategy as an arena allocator, applied to an
/// append-only output sink rather than an allocator.
pub struct ByteBuffer {
	chunk_size: usize,
	chunks: Vec<Vec<u8>>,
	len: usize,
}

impl ByteBuffer {
	pub fn new() -> Self {
		Self::with_chunk_size(DEFAULT_CHUNK_SIZE)
	}

	pub fn with_chunk_size(chunk_size: usize) -> Self {
		assert!(chunk_size > 0, "chunk size must be non-zero");
		Self {
			chunk_size,
			chunks: vec![Vec::with_capacity(chunk_size)],
			len: 0,
		}
	}

	/// Flattens all chunks into one contiguous region. A single-chunk buffer
	/// is returned without copying.
	pub fn snapshot(&self) -> Vec<u8> {
		if self.chunks.len() == 1 {
			return self.chunks[0].clone();
		}

		let mut out = Vec::with_capacity(self.len);
		for chunk in &self.chunks {
			out.extend_from_slice(chunk);
		}
		out
	}

}

impl Default for ByteBuffer {
	fn default() -> Self {
		Self::new()
	}
}

impl Output for ByteBuffer {
	fn put_byte(&mut self, byte: u8) {
		let chunk_size = self.chunk_size;
		if self.chunks.last().map_or(true, |c| c.len() == chunk_size) {
			self.chunks.push(Vec::with_capacity(chunk_size));
		}
		self.chunks.last_mut().unwrap().push(byte);
		self.len += 1;
	}

	fn put_bytes(&mut self, src: &[u8]) {
		for &b in src {
			self.put_byte(b);
		}
	}

	fn length(&self) -> usize {
		self.len
	}
}

impl Output for Vec<u8> {
	fn put_byte(&mut self, byte: u8) {
		self.push(byte);
	}

	fn put_bytes(&mut self, src: &[u8]) {
		self.extend_from_slice(src);
	}

	fn length(&self) -> usize {
		self.len()
	}
}

/// Counts bytes without storing them, used to compute `Encode::size` cheaply.
pub struct SizeCalculator(usize);

impl SizeCalculator {
	pub fn new() -> Self {
		Self(0)
	}

	pub fn size(&self) -> usize {
		self.0
	}
}

impl Default for SizeCalculator {
	fn default() -> Self {
		Self::new()
	}
}

impl Output for SizeCalculator {
	fn put_byte(&mut self, _byte: u8) {
		self.0 += 1;
	}

	fn put_bytes(&mut self, src: &[u8]) {
		self.0 += src.len();
	}

	fn length(&self) -> usize {
		self.0
	}
}

#[allow(unused)]
fn _assert_no_capacity_failure(_: &dyn Output) -> Result<(), CodecError> {
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn grows_across_chunk_boundaries() {
		let mut buf = ByteBuffer::with_chunk_size(4);
		for i in 0..10u8 {
			buf.put_byte(i);
		}
		assert_eq!(buf.length(), 10);
		assert_eq!(buf.snapshot(), (0..10u8).collect::<Vec<_>>());
	}

	#[test]
	fn put_bytes_matches_put_byte() {
		let mut buf = ByteBuffer::with_chunk_size(3);
		buf.put_bytes(&[1, 2, 3, 4, 5]);
		assert_eq!(buf.snapshot(), vec![1, 2, 3, 4, 5]);
	}

	#[test]
	fn single_chunk_snapshot_is_exact() {
		let mut buf = ByteBuffer::new();
		buf.put_bytes(b"hello");
		assert_eq!(buf.snapshot(), b"hello");
	}
}
