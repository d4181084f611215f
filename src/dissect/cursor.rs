use super::packet::Malformed;

/// Bounds-checked forward reader over a captured frame.
///
/// Every read either returns the requested bytes or leaves the position
/// untouched, so a failed layer never moves the consumed offset.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Fails with a truncation marker for `layer` if fewer than `n` bytes remain.
    pub fn require(&self, layer: &'static str, n: usize) -> Result<(), Malformed> {
        if self.remaining() < n {
            Err(Malformed::truncated(layer, n, self.remaining()))
        } else {
            Ok(())
        }
    }

    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos.checked_add(n)?)
    }

    pub fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        let bytes = self.peek(n)?;
        self.pos += n;
        Some(bytes)
    }

    /// Takes `n` bytes or reports `layer` as truncated.
    pub fn take_for(&mut self, layer: &'static str, n: usize) -> Result<&'a [u8], Malformed> {
        self.require(layer, n)?;
        Ok(self.take(n).unwrap_or_default())
    }

    pub fn skip(&mut self, n: usize) -> bool {
        self.take(n).is_some()
    }
}

pub fn be_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

pub fn be_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Like [`be_u16`] but tolerant of short input.
pub fn read_u16(bytes: &[u8], at: usize) -> Option<u16> {
    let b = bytes.get(at..at.checked_add(2)?)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

pub fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let b = bytes.get(at..at.checked_add(4)?)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}
