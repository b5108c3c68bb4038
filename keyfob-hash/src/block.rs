//! Block accumulation and Merkle–Damgård padding shared by all hash implementations.

/// Encoding of the message length that is appended to the final block.
#[derive(Clone, Copy)]
pub(crate) enum Length {
    /// 64-bit little-endian bit count (MD5).
    Le64,
    /// 64-bit big-endian bit count (SHA-1, SHA-224, SHA-256).
    Be64,
    /// 128-bit big-endian bit count (SHA-384, SHA-512).
    Be128,
}

impl Length {
    const fn width(self) -> usize {
        match self {
            Self::Le64 | Self::Be64 => 8,
            Self::Be128 => 16,
        }
    }
}

/// Buffer that collects input bytes until a full block of `N` bytes is available and hands each
/// full block to a compression function.
#[derive(Clone)]
pub(crate) struct BlockBuffer<const N: usize> {
    buf: [u8; N],
    pos: usize,
    /// Total amount of bytes fed so far.
    len: u128,
}

impl<const N: usize> BlockBuffer<N> {
    pub const fn new() -> Self {
        Self {
            buf: [0; N],
            pos: 0,
            len: 0,
        }
    }

    /// Append `data`, calling `compress` for every block that becomes complete. A partial tail
    /// stays buffered for the next call.
    pub fn update(&mut self, mut data: &[u8], mut compress: impl FnMut(&[u8; N])) {
        self.len = self.len.wrapping_add(data.len() as u128);

        if self.pos > 0 {
            let take = (N - self.pos).min(data.len());
            self.buf[self.pos..self.pos + take].copy_from_slice(&data[..take]);
            self.pos += take;
            data = &data[take..];

            if self.pos < N {
                return;
            }

            compress(&self.buf);
            self.pos = 0;
        }

        let mut blocks = data.chunks_exact(N);
        for block in &mut blocks {
            self.buf.copy_from_slice(block);
            compress(&self.buf);
        }

        let rest = blocks.remainder();
        self.buf[..rest.len()].copy_from_slice(rest);
        self.pos = rest.len();
    }

    /// Apply the final padding (`0x80`, zero fill, bit length) and compress the last block(s).
    pub fn finish(&mut self, length: Length, mut compress: impl FnMut(&[u8; N])) {
        let bits = self.len.wrapping_mul(8);
        let width = length.width();

        self.buf[self.pos] = 0x80;
        self.buf[self.pos + 1..].fill(0);

        if self.pos + 1 > N - width {
            compress(&self.buf);
            self.buf.fill(0);
        }

        let field = &mut self.buf[N - width..];
        match length {
            Length::Le64 => field.copy_from_slice(&(bits as u64).to_le_bytes()),
            Length::Be64 => field.copy_from_slice(&(bits as u64).to_be_bytes()),
            Length::Be128 => field.copy_from_slice(&bits.to_be_bytes()),
        }

        compress(&self.buf);
        self.pos = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_partial_tail() {
        let mut buffer = BlockBuffer::<4>::new();
        let mut blocks = Vec::new();

        buffer.update(b"abcdef", |b| blocks.push(*b));
        buffer.update(b"gh", |b| blocks.push(*b));
        buffer.update(b"i", |b| blocks.push(*b));

        assert_eq!(vec![*b"abcd", *b"efgh"], blocks);
        assert_eq!(1, buffer.pos);
        assert_eq!(9, buffer.len);
    }

    #[test]
    fn pads_into_extra_block() {
        let mut buffer = BlockBuffer::<16>::new();
        let mut blocks = Vec::new();

        // 8 bytes of data leave no room for 0x80 plus an 8 byte length.
        buffer.update(&[0xff; 8], |b| blocks.push(*b));
        buffer.finish(Length::Be64, |b| blocks.push(*b));

        assert_eq!(2, blocks.len());
        assert_eq!(0x80, blocks[0][8]);
        assert_eq!([0; 8], blocks[0][9..16]);
        assert_eq!(64_u64.to_be_bytes(), blocks[1][8..16]);
    }
}
