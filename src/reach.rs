//! Representable-range checks for relative pointer fields.
//!
//! Narrow relocation fields (signed 16-bit is common in console formats)
//! overflow easily under naive placement. The three-way [`Reachability`]
//! result tells the layout engine not just that a distance failed, but by how
//! much and in which direction.

use byteorder::{ByteOrder, BE};

/// Signed storage width of a relative pointer field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PointerWidth {
    S8,
    S16,
    S32,
}

impl PointerWidth {
    pub const fn byte_len(self) -> usize {
        match self {
            PointerWidth::S8 => 1,
            PointerWidth::S16 => 2,
            PointerWidth::S32 => 4,
        }
    }

    /// The representable signed range of a field of this width.
    pub const fn constraint(self) -> DistanceConstraint {
        match self {
            PointerWidth::S8 => DistanceConstraint::new(i8::MIN as i64, i8::MAX as i64),
            PointerWidth::S16 => DistanceConstraint::new(i16::MIN as i64, i16::MAX as i64),
            PointerWidth::S32 => DistanceConstraint::new(i32::MIN as i64, i32::MAX as i64),
        }
    }

    /// Encodes `delta` big-endian into `field`, which must be exactly
    /// [`byte_len`](Self::byte_len) bytes. The caller must have verified
    /// reachability; this never truncates silently.
    pub(crate) fn encode(self, field: &mut [u8], delta: i64) {
        debug_assert_eq!(field.len(), self.byte_len());
        debug_assert!(self.constraint().check(delta).is_reachable());
        match self {
            PointerWidth::S8 => field[0] = delta as i8 as u8,
            PointerWidth::S16 => BE::write_i16(field, delta as i16),
            PointerWidth::S32 => BE::write_i32(field, delta as i32),
        }
    }
}

/// The signed byte distances a pointer field can represent.
///
/// `min <= max` always holds; `min <= 0 <= max` is not required, since some
/// relocation schemes are forward-only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DistanceConstraint {
    pub min: i64,
    pub max: i64,
}

impl DistanceConstraint {
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Whether `delta` is representable, and if not, by how much it misses.
    pub fn check(self, delta: i64) -> Reachability {
        if delta > self.max {
            return Reachability::AboveMax(self.max - delta);
        }
        if delta < self.min {
            return Reachability::BelowMin(delta - self.min);
        }
        Reachability::Reachable
    }
}

impl Default for DistanceConstraint {
    fn default() -> Self {
        PointerWidth::S32.constraint()
    }
}

/// Outcome of a reachability check. The overflow amounts are negative,
/// measuring how far outside the range the distance fell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    /// `delta < min`; carries `delta - min`.
    BelowMin(i64),
    /// `delta > max`; carries `max - delta`.
    AboveMax(i64),
}

impl Reachability {
    pub fn is_reachable(self) -> bool {
        matches!(self, Reachability::Reachable)
    }
}

impl std::fmt::Display for Reachability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reachability::Reachable => write!(f, "reachable"),
            Reachability::BelowMin(by) => write!(f, "{} below minimum", -by),
            Reachability::AboveMax(by) => write!(f, "{} above maximum", -by),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s16_boundaries() {
        let c = PointerWidth::S16.constraint();
        assert_eq!(c.check(32767), Reachability::Reachable);
        assert_eq!(c.check(32768), Reachability::AboveMax(-1));
        assert_eq!(c.check(-32768), Reachability::Reachable);
        assert_eq!(c.check(-32769), Reachability::BelowMin(-1));
    }

    #[test]
    fn overflow_amounts_scale() {
        let c = DistanceConstraint::new(-100, 100);
        assert_eq!(c.check(150), Reachability::AboveMax(-50));
        assert_eq!(c.check(-130), Reachability::BelowMin(-30));
        assert_eq!(c.check(0), Reachability::Reachable);
    }

    #[test]
    fn forward_only_scheme() {
        // min <= 0 <= max is not required
        let c = DistanceConstraint::new(4, 1024);
        assert_eq!(c.check(0), Reachability::BelowMin(-4));
        assert_eq!(c.check(4), Reachability::Reachable);
    }

    #[test]
    fn encode_widths() {
        let mut b1 = [0u8; 1];
        PointerWidth::S8.encode(&mut b1, -2);
        assert_eq!(b1, [0xFE]);

        let mut b2 = [0u8; 2];
        PointerWidth::S16.encode(&mut b2, -2);
        assert_eq!(b2, [0xFF, 0xFE]);

        let mut b4 = [0u8; 4];
        PointerWidth::S32.encode(&mut b4, 0x1234);
        assert_eq!(b4, [0x00, 0x00, 0x12, 0x34]);
    }
}
