/// Conversion operator kinds a strategy is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumIter)]
pub enum TransformKind {
    Reshape,
    Transpose,
    Cast,
    TransData,
    TransDataRnn,
    Reformat,
    SqueezeV2,
    UnsqueezeV2,
    /// Marks a format pair that must never be converted.
    Forbidden,
}

impl TransformKind {
    /// Operator type of the node this kind inserts.
    pub const fn op_type(self) -> &'static str {
        match self {
            Self::Reshape => "Reshape",
            Self::Transpose => "TransposeD",
            Self::Cast => "Cast",
            Self::TransData => "TransData",
            Self::TransDataRnn => "TransDataRNN",
            Self::Reformat => "ReFormat",
            Self::SqueezeV2 => "SqueezeV2",
            Self::UnsqueezeV2 => "UnsqueezeV2",
            Self::Forbidden => "Forbidden",
        }
    }

    /// Kind whose inserted nodes carry `op_type`.
    pub fn from_op_type(op_type: &str) -> Option<Self> {
        use strum::IntoEnumIterator;
        Self::iter().filter(|kind| *kind != Self::Forbidden).find(|kind| kind.op_type() == op_type)
    }
}
