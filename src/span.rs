//! Bounds-checked views over immutable byte buffers.
//!
//! Console archive formats are routinely opened in a partially corrupt state
//! (legacy assets, bad dumps). Every accessor here degrades on out-of-range
//! input: typed loads return `None`, string resolution returns `""`. Nothing
//! in this module panics or allocates.

use byteorder::{ByteOrder, BE};

/// Read-only view over an immutable byte buffer.
///
/// All multi-byte loads are big-endian, matching console-native formats.
#[derive(Clone, Copy, Debug, Eq)]
pub struct ByteSpan<'a> {
    data: &'a [u8],
}

impl PartialEq for ByteSpan<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<'a> ByteSpan<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn empty() -> Self {
        Self { data: &[] }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.data
    }

    /// Sub-view of `len` bytes starting at `offset`, or `None` if the range
    /// does not lie fully inside this span.
    pub fn slice(&self, offset: usize, len: usize) -> Option<ByteSpan<'a>> {
        let end = offset.checked_add(len)?;
        if end > self.data.len() {
            return None;
        }
        Some(ByteSpan::new(&self.data[offset..end]))
    }

    /// Sub-view from `offset` to the end of this span.
    pub fn tail(&self, offset: usize) -> Option<ByteSpan<'a>> {
        if offset > self.data.len() {
            return None;
        }
        Some(ByteSpan::new(&self.data[offset..]))
    }

    pub fn get_u8(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    pub fn get_u16(&self, offset: usize) -> Option<u16> {
        let raw = self.data.get(offset..offset.checked_add(2)?)?;
        Some(BE::read_u16(raw))
    }

    pub fn get_u32(&self, offset: usize) -> Option<u32> {
        let raw = self.data.get(offset..offset.checked_add(4)?)?;
        Some(BE::read_u32(raw))
    }

    pub fn get_i32(&self, offset: usize) -> Option<i32> {
        let raw = self.data.get(offset..offset.checked_add(4)?)?;
        Some(BE::read_i32(raw))
    }

    /// Four-byte tag at `offset` (fourcc).
    pub fn get_tag(&self, offset: usize) -> Option<[u8; 4]> {
        let raw = self.data.get(offset..offset.checked_add(4)?)?;
        Some([raw[0], raw[1], raw[2], raw[3]])
    }

    /// NUL-terminated string starting at `offset`. Runs to the end of the
    /// span if no NUL is found. Returns `""` if `offset` is out of range or
    /// the bytes are not valid UTF-8.
    pub fn cstr(&self, offset: usize) -> &'a str {
        let Some(raw) = self.data.get(offset..) else {
            return "";
        };
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        std::str::from_utf8(&raw[..end]).unwrap_or("")
    }

    /// Resolves an in-file relative string pointer.
    ///
    /// Reads an `s32` at `pointer_location` and interprets it relative to
    /// `addend`. A stored value of 0 means "no string" and a target outside
    /// the span degrades to `""`; `pointer_location` itself being out of
    /// range also degrades to `""`.
    pub fn read_string_pointer(&self, pointer_location: usize, addend: usize) -> &'a str {
        match self.resolve_pointer(pointer_location, addend) {
            Some(target) => self.cstr(target),
            None => "",
        }
    }

    /// Resolves a relative pointer field to an absolute offset.
    ///
    /// Reads an `s32` at `field_offset` and computes
    /// `reference_offset + value`. Returns `None` when the stored value is 0
    /// (reserved for "absent") or the computed offset falls outside
    /// `[0, len)`.
    pub fn resolve_pointer(&self, field_offset: usize, reference_offset: usize) -> Option<usize> {
        let rel = self.get_i32(field_offset)?;
        if rel == 0 {
            return None;
        }

        let target = reference_offset as i64 + rel as i64;
        if target < 0 || target >= self.data.len() as i64 {
            return None;
        }
        Some(target as usize)
    }
}

/// Sequential reader over a [`ByteSpan`].
///
/// Reads advance the position and return `None` past the end instead of
/// erroring, so callers can thread `?` through `Option` while walking
/// structures of unknown provenance.
#[derive(Clone, Copy, Debug)]
pub struct SpanCursor<'a> {
    span: ByteSpan<'a>,
    pos: usize,
}

impl<'a> SpanCursor<'a> {
    pub fn new(span: ByteSpan<'a>) -> Self {
        Self { span, pos: 0 }
    }

    pub fn at(span: ByteSpan<'a>, pos: usize) -> Self {
        Self { span, pos }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.span.len().saturating_sub(self.pos)
    }

    pub fn skip(&mut self, count: usize) -> Option<()> {
        let next = self.pos.checked_add(count)?;
        if next > self.span.len() {
            return None;
        }
        self.pos = next;
        Some(())
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let v = self.span.get_u8(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let v = self.span.get_u16(self.pos)?;
        self.pos += 2;
        Some(v)
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let v = self.span.get_u32(self.pos)?;
        self.pos += 4;
        Some(v)
    }

    pub fn read_i32(&mut self) -> Option<i32> {
        let v = self.span.get_i32(self.pos)?;
        self.pos += 4;
        Some(v)
    }

    /// Reads an `s32` name pointer at the cursor and resolves it relative to
    /// `struct_start` (the start of the structure currently being read).
    /// Degrades to `""` on a zero or out-of-range pointer; the cursor still
    /// advances past the field.
    pub fn read_name(&mut self, struct_start: usize) -> &'a str {
        let field = self.pos;
        if self.read_i32().is_none() {
            return "";
        }
        self.span.read_string_pointer(field, struct_start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_loads_are_big_endian() {
        let span = ByteSpan::new(&[0x12, 0x34, 0x56, 0x78]);
        assert_eq!(span.get_u16(0), Some(0x1234));
        assert_eq!(span.get_u32(0), Some(0x1234_5678));
        assert_eq!(span.get_i32(0), Some(0x1234_5678));
    }

    #[test]
    fn out_of_range_loads_are_absent() {
        let span = ByteSpan::new(&[0xFF; 3]);
        assert_eq!(span.get_u32(0), None);
        assert_eq!(span.get_u16(2), None);
        assert_eq!(span.get_u8(3), None);
        assert!(span.slice(1, 3).is_none());
        assert!(span.slice(usize::MAX, 1).is_none());
    }

    #[test]
    fn cstr_stops_at_nul() {
        let span = ByteSpan::new(b"mesh\0junk");
        assert_eq!(span.cstr(0), "mesh");
        assert_eq!(span.cstr(5), "junk");
        assert_eq!(span.cstr(100), "");
    }

    #[test]
    fn zero_pointer_is_null_not_self() {
        // A stored 0 must resolve to "absent", never to the block located
        // exactly at the reference offset.
        let mut data = vec![0u8; 8];
        data.extend_from_slice(b"name\0");
        let span = ByteSpan::new(&data);
        assert_eq!(span.resolve_pointer(0, 4), None);
        assert_eq!(span.read_string_pointer(0, 4), "");
    }

    #[test]
    fn pointer_resolution_within_bounds() {
        let mut data = vec![0u8; 8];
        data[0..4].copy_from_slice(&4i32.to_be_bytes());
        data.extend_from_slice(b"tex0\0");
        let span = ByteSpan::new(&data);
        // 4 (base) + 4 (relative) = 8, start of the string
        assert_eq!(span.resolve_pointer(0, 4), Some(8));
        assert_eq!(span.read_string_pointer(0, 4), "tex0");
    }

    #[test]
    fn pointer_out_of_range_degrades() {
        let mut data = vec![0u8; 8];
        data[0..4].copy_from_slice(&1000i32.to_be_bytes());
        data[4..8].copy_from_slice(&(-1000i32).to_be_bytes());
        let span = ByteSpan::new(&data);
        assert_eq!(span.resolve_pointer(0, 0), None);
        assert_eq!(span.resolve_pointer(4, 0), None);
        assert_eq!(span.read_string_pointer(0, 0), "");
    }

    #[test]
    fn cursor_reads_advance() {
        let data = [0x00u8, 0x01, 0x00, 0x00, 0x00, 0x02];
        let mut cur = SpanCursor::new(ByteSpan::new(&data));
        assert_eq!(cur.read_u16(), Some(1));
        assert_eq!(cur.read_u32(), Some(2));
        assert_eq!(cur.read_u8(), None);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn cursor_read_name_resolves_relative_to_struct() {
        // struct at 4: [name ofs = 8] ... string at 4+8=12
        let mut data = vec![0u8; 12];
        data[4..8].copy_from_slice(&8i32.to_be_bytes());
        data.extend_from_slice(b"bone\0");
        let span = ByteSpan::new(&data);
        let mut cur = SpanCursor::at(span, 4);
        assert_eq!(cur.read_name(4), "bone");
        assert_eq!(cur.position(), 8);
    }
}
