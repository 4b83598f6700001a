//! Hardware layout tags.
//!
//! A [`Format`] names how a tensor is laid out in memory. Plain formats
//! (`NCHW`, `NHWC`, ...) carry one axis letter per dimension; hardware formats
//! (`NC1HWC0`, `FRACTAL_Z`, ...) split and pad axes for the cube/vector units
//! and have no one-to-one letter mapping. The discriminants are the backend's
//! wire values, so `format as u32` can be packed into strategy keys.
//!
//! The grouped-convolution group count and similar refinements travel next to
//! the format as a separate sub-format integer on the tensor descriptor.

/// Primary tensor layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(strum::Display, strum::EnumString, strum::AsRefStr, strum::EnumIter, strum::FromRepr)]
#[cfg_attr(any(test, feature = "proptest"), derive(proptest_derive::Arbitrary))]
#[repr(u8)]
pub enum Format {
    #[strum(serialize = "NCHW")]
    Nchw = 0,
    #[strum(serialize = "NHWC")]
    Nhwc = 1,
    #[strum(serialize = "ND")]
    Nd = 2,
    #[strum(serialize = "NC1HWC0")]
    Nc1hwc0 = 3,
    #[strum(serialize = "FRACTAL_Z")]
    FractalZ = 4,
    #[strum(serialize = "NC1HWC0_C04")]
    Nc1hwc0C04 = 12,
    #[strum(serialize = "FRACTAL_Z_C04")]
    FractalZC04 = 13,
    #[strum(serialize = "CHWN")]
    Chwn = 14,
    #[strum(serialize = "HWCN")]
    Hwcn = 16,
    #[strum(serialize = "C1HWNCoC0")]
    C1hwncoc0 = 25,
    #[strum(serialize = "NDHWC")]
    Ndhwc = 27,
    #[strum(serialize = "FRACTAL_NZ")]
    FractalNz = 29,
    #[strum(serialize = "NCDHW")]
    Ncdhw = 30,
    #[strum(serialize = "DHWCN")]
    Dhwcn = 31,
    #[strum(serialize = "NDC1HWC0")]
    Ndc1hwc0 = 32,
    #[strum(serialize = "FRACTAL_Z_3D")]
    FractalZ3d = 33,
    #[strum(serialize = "DHWNC")]
    Dhwnc = 36,
    #[strum(serialize = "FRACTAL_ZN_LSTM")]
    FractalZnLstm = 38,
    #[strum(serialize = "RESERVED")]
    Reserved = 40,
    #[strum(serialize = "ND_RNN_BIAS")]
    NdRnnBias = 43,
    #[strum(serialize = "FRACTAL_ZN_RNN")]
    FractalZnRnn = 44,
}

impl Format {
    /// Axis letters, one per dimension, for formats whose axes are identifiable.
    pub const fn axes(self) -> Option<&'static str> {
        match self {
            Self::Nchw => Some("NCHW"),
            Self::Nhwc => Some("NHWC"),
            Self::Hwcn => Some("HWCN"),
            Self::Chwn => Some("CHWN"),
            Self::Ndhwc => Some("NDHWC"),
            Self::Ncdhw => Some("NCDHW"),
            Self::Dhwcn => Some("DHWCN"),
            Self::Dhwnc => Some("DHWNC"),
            _ => None,
        }
    }

    /// Plain formats whose every dimension maps to a known axis letter.
    pub const fn is_identifiable(self) -> bool {
        self.axes().is_some()
    }

    /// Identifiable formats plus `ND`.
    pub const fn is_plain(self) -> bool {
        self.is_identifiable() || matches!(self, Self::Nd)
    }

    /// Hardware formats: anything that repacks data beyond a plain axis order.
    pub const fn is_hardware(self) -> bool {
        !self.is_plain()
    }

    /// Plain format whose axis order a lower-rank shape is expanded into before
    /// it can be converted into `self`.
    pub const fn expansion_format(self) -> Option<Format> {
        match self {
            Self::Nchw | Self::Nhwc | Self::Hwcn | Self::Chwn => Some(self),
            Self::Ndhwc | Self::Ncdhw | Self::Dhwcn | Self::Dhwnc => Some(self),
            Self::Nc1hwc0 | Self::Nc1hwc0C04 | Self::FractalZ | Self::FractalZC04 | Self::C1hwncoc0 => {
                Some(Self::Nchw)
            }
            Self::Ndc1hwc0 | Self::FractalZ3d => Some(Self::Ndhwc),
            _ => None,
        }
    }

    /// Full rank of the expansion axes (4 for 2D-conv layouts, 5 for 3D).
    pub fn expansion_rank(self) -> Option<usize> {
        self.expansion_format().and_then(Format::axes).map(str::len)
    }

    pub const fn is_rnn(self) -> bool {
        matches!(self, Self::FractalZnRnn | Self::NdRnnBias)
    }

    /// Identifiable format with exactly the given axis letters, if one exists.
    pub fn from_axes(axes: &str) -> Option<Format> {
        use strum::IntoEnumIterator;
        Format::iter().find(|format| format.axes() == Some(axes))
    }

    /// Position of `letter` in this format's axis letters.
    pub fn axis_index(self, letter: char) -> Option<usize> {
        self.axes()?.find(letter)
    }
}
