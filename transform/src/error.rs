use kiln_ir::Format;
use snafu::Snafu;

use crate::strategy::StrategyId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    /// Descriptor or graph edit rejected by the IR.
    #[snafu(display("graph edit failed: {source}"))]
    Graph { source: kiln_ir::Error },

    #[snafu(display("conversion {src} -> {dst} is forbidden (strategy {strategy})"))]
    ForbiddenStrategy { strategy: StrategyId, src: Format, dst: Format },

    #[snafu(display("no conversion strategy for {src} -> {dst} (strategy {strategy})"))]
    MissingStrategy { strategy: StrategyId, src: Format, dst: Format },

    #[snafu(display("no output shape rule for {src} -> {target} feeding {consumer}"))]
    NoShapeRule { consumer: String, src: Format, target: Format },

    /// A reshape target does not fit the int32 shape operand.
    #[snafu(display("reshape target dimension {dim} feeding {consumer} does not fit in int32"))]
    ShapeOutOfRange { consumer: String, dim: i64 },

    /// The strategy ran to completion without any node being rejected, yet the
    /// edge still disagrees on format, sub-format or dtype.
    #[snafu(display("edge still differs after its strategy: produces {current}, expects {expected}"))]
    UnresolvedLayout { current: String, expected: String },

    /// A `Reshape` lost the input its target-shape constant attaches to.
    #[snafu(display("{node}: reshape has {inputs} inputs, expected 2"))]
    MissingShapeInput { node: String, inputs: usize },

    #[snafu(display("edge {src_op} ({src_format}) -> {dst_op} ({dst_format}), strategy {strategy}: {source}"))]
    EdgeFailed {
        src_op: String,
        dst_op: String,
        src_format: Format,
        dst_format: Format,
        strategy: StrategyId,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },
}

impl From<kiln_ir::Error> for Error {
    fn from(source: kiln_ir::Error) -> Self {
        Self::Graph { source }
    }
}
