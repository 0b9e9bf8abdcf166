//! Receive-side FIFO decoding and the per-port transfer buffer.
//!
//! The GENI RX FIFO hands out 32-bit words, four characters each, little
//! endian. The debugger wants one byte at a time, so a refill drains every
//! pending word into [`FifoTransferBuffer`] and later calls are served from
//! there.

/// Depth of the RX FIFO in 32-bit words.
pub const RX_FIFO_DEPTH_WORDS: usize = 64;
/// Bytes the transfer buffer can hold.
pub const RX_BUFFER_CAPACITY: usize = RX_FIFO_DEPTH_WORDS * 4;

const RX_FIFO_WC_MASK: u32 = 0x01FF_FFFF;
const RX_LAST_BYTE_VALID_SHIFT: u32 = 28;
const RX_LAST_BYTE_VALID_MASK: u32 = 0x7;
/// Hardware reports a completely filled last word as 4 rather than 0.
const RX_LAST_BYTE_VALID_FULL: u32 = 4;

/// Decoded `SE_GENI_RX_FIFO_STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RxFifoStatus {
    words: usize,
    partial: usize,
}

impl RxFifoStatus {
    /// Decodes the raw register value.
    #[must_use]
    pub fn decode(raw: u32) -> Self {
        let mut last = (raw >> RX_LAST_BYTE_VALID_SHIFT) & RX_LAST_BYTE_VALID_MASK;
        if last >= RX_LAST_BYTE_VALID_FULL {
            last = 0;
        }
        Self {
            words: (raw & RX_FIFO_WC_MASK) as usize,
            partial: last as usize,
        }
    }

    /// Words holding four valid bytes.
    #[must_use]
    pub const fn whole_words(&self) -> usize {
        if self.partial != 0 {
            self.words.saturating_sub(1)
        } else {
            self.words
        }
    }

    /// Valid bytes in the trailing partial word, 0 if there is none.
    #[must_use]
    pub const fn partial_bytes(&self) -> usize {
        if self.words == 0 { 0 } else { self.partial }
    }

    /// Total bytes waiting in the FIFO.
    #[must_use]
    pub const fn total_bytes(&self) -> usize {
        self.whole_words() * 4 + self.partial_bytes()
    }
}

/// Bytes unpacked from the RX FIFO and not yet handed out.
#[derive(Debug, Clone)]
pub struct FifoTransferBuffer {
    bytes: [u8; RX_BUFFER_CAPACITY],
    cursor: usize,
    remaining: usize,
}

impl Default for FifoTransferBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FifoTransferBuffer {
    /// Creates an empty buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [0; RX_BUFFER_CAPACITY],
            cursor: 0,
            remaining: 0,
        }
    }

    /// Drops any buffered bytes.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.remaining = 0;
    }

    /// Bytes still buffered.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.remaining
    }

    /// Returns `true` if nothing is buffered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.remaining == 0
    }

    /// Takes the next buffered byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.remaining == 0 {
            return None;
        }
        let byte = self.bytes[self.cursor];
        self.cursor += 1;
        self.remaining -= 1;
        Some(byte)
    }

    /// Refills from the FIFO described by `status`, pulling words with
    /// `next_word`.
    ///
    /// Only valid on an empty buffer. Whole words are unpacked first, then
    /// the partial word's low bytes.
    ///
    /// # Errors
    ///
    /// Returns the pending byte count, without reading any word, if it does
    /// not fit.
    pub fn fill(&mut self, status: RxFifoStatus, mut next_word: impl FnMut() -> u32) -> Result<usize, usize> {
        let total = status.total_bytes();
        if total > RX_BUFFER_CAPACITY {
            return Err(total);
        }

        let mut len = 0;
        for _ in 0..status.whole_words() {
            self.bytes[len..len + 4].copy_from_slice(&next_word().to_le_bytes());
            len += 4;
        }
        let partial = status.partial_bytes();
        if partial != 0 {
            let word = next_word().to_le_bytes();
            self.bytes[len..len + partial].copy_from_slice(&word[..partial]);
            len += partial;
        }

        self.cursor = 0;
        self.remaining = len;
        Ok(len)
    }
}
