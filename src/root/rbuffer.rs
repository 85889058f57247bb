//! Big-endian cursor over ROOT-serialized bytes.

use super::error::{Result, RootError};

/// Bit set in the leading `u32` of a streamed object when a byte count follows.
const BYTE_COUNT_MASK: u32 = 0x4000_0000;
/// Same flag as seen from the 16-bit version word of a `TObject`.
const VERSION_BYTE_COUNT_MASK: u16 = 0x4000;
/// `TObject::fBits` flag: object is referenced and carries a process ID.
const IS_REFERENCED: u32 = 1 << 4;

pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

macro_rules! read_be {
    ($name:ident, $ty:ty) => {
        pub(crate) fn $name(&mut self) -> Result<$ty> {
            const N: usize = std::mem::size_of::<$ty>();
            let bytes = self.take(N)?;
            let mut buf = [0u8; N];
            buf.copy_from_slice(bytes);
            Ok(<$ty>::from_be_bytes(buf))
        }
    };
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[cfg(test)]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: pos - self.pos.min(pos),
                have: self.data.len().saturating_sub(self.pos),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|&end| end <= self.data.len());
        let Some(end) = end else {
            return Err(RootError::BufferUnderflow {
                offset: self.pos,
                need: n,
                have: self.data.len().saturating_sub(self.pos),
            });
        };
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    read_be!(read_u8, u8);
    read_be!(read_u16, u16);
    read_be!(read_i16, i16);
    read_be!(read_u32, u32);
    read_be!(read_i32, i32);
    read_be!(read_u64, u64);
    read_be!(read_f32, f32);
    read_be!(read_f64, f64);

    /// Read a 32- or 64-bit seek pointer.
    pub(crate) fn read_seek(&mut self, large: bool) -> Result<u64> {
        if large {
            self.read_u64()
        } else {
            self.read_u32().map(u64::from)
        }
    }

    /// `TString`: one length byte, or `255` followed by a `u32` length.
    pub(crate) fn read_string(&mut self) -> Result<String> {
        let short = self.read_u8()?;
        let len = if short == 255 {
            self.read_u32()? as usize
        } else {
            short as usize
        };
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Streamer header: returns the class version and, when a byte count is
    /// present, the absolute position where the object ends.
    pub(crate) fn read_version(&mut self) -> Result<(u16, Option<usize>)> {
        let start = self.pos;
        let word = self.read_u32()?;
        if word & BYTE_COUNT_MASK != 0 {
            let count = (word & !BYTE_COUNT_MASK) as usize;
            let version = self.read_u16()?;
            Ok((version, Some(start + 4 + count)))
        } else {
            // No byte count: the first two bytes were the version itself.
            self.seek(start + 2)?;
            Ok(((word >> 16) as u16, None))
        }
    }

    /// Skip an embedded object that was written with a byte count.
    pub(crate) fn skip_object(&mut self, what: &str) -> Result<()> {
        match self.read_version()? {
            (_, Some(end)) => self.seek(end),
            (_, None) => Err(RootError::Malformed(format!(
                "{what} written without byte count"
            ))),
        }
    }

    pub(crate) fn read_tobject(&mut self) -> Result<()> {
        let version = self.read_u16()?;
        if version & VERSION_BYTE_COUNT_MASK != 0 {
            self.skip(4)?;
        }
        let _unique_id = self.read_u32()?;
        let bits = self.read_u32()?;
        if bits & IS_REFERENCED != 0 {
            self.skip(2)?;
        }
        Ok(())
    }

    /// `TNamed`: versioned `TObject` followed by name and title.
    pub(crate) fn read_tnamed(&mut self) -> Result<(String, String)> {
        let (_, end) = self.read_version()?;
        self.read_tobject()?;
        let name = self.read_string()?;
        let title = self.read_string()?;
        if let Some(end) = end {
            self.seek(end)?;
        }
        Ok((name, title))
    }

    /// `TArrayD` member: `i32` length followed by the values.
    pub(crate) fn read_array_f64(&mut self) -> Result<Vec<f64>> {
        let n = self.read_array_len()?;
        (0..n).map(|_| self.read_f64()).collect()
    }

    pub(crate) fn read_array_f32(&mut self) -> Result<Vec<f64>> {
        let n = self.read_array_len()?;
        (0..n).map(|_| self.read_f32().map(f64::from)).collect()
    }

    fn read_array_len(&mut self) -> Result<usize> {
        let n = self.read_i32()?;
        usize::try_from(n).map_err(|_| RootError::Malformed(format!("negative array length {n}")))
    }
}
