use kiln_ir::Format;

/// Packed strategy key: `(src << 8) | dst | extra_bits`.
///
/// Formats occupy the low 16 bits; condition bits start at bit 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{_0:#x}")]
pub struct StrategyId(u32);

impl StrategyId {
    /// Set when a grouped-convolution weight is involved.
    pub const GROUPED: u32 = 1 << 16;

    const FORMAT_BITS: u32 = 0xffff;

    pub const fn new(src: Format, dst: Format) -> Self {
        Self(((src as u32) << 8) | dst as u32)
    }

    pub const fn with_extra_bits(self, bits: u32) -> Self {
        Self(self.0 | (bits & !Self::FORMAT_BITS))
    }

    pub fn src_format(self) -> Option<Format> {
        Format::from_repr(((self.0 >> 8) & 0xff) as u8)
    }

    pub fn dst_format(self) -> Option<Format> {
        Format::from_repr((self.0 & 0xff) as u8)
    }

    pub const fn extra_bits(self) -> u32 {
        self.0 & !Self::FORMAT_BITS
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}
