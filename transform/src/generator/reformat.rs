use kiln_ir::{Format, TensorDesc};

use super::{Generator, Step};
use crate::error::Result;
use crate::strategy::TransformKind;
use crate::transfer_info::TransferInfo;

/// Relabel between a plain format and `ND` without moving data.
///
/// Leaving any format goes to `ND`; leaving `ND` goes to the destination
/// format. `ND <-> FRACTAL_NZ` needs real data movement and is left to `TransData`.
pub(super) fn add(generator: &mut Generator<'_>, info: TransferInfo) -> Result<Step> {
    let (src, dst) = (info.src.tensor.format, info.dst.tensor.format);
    let nd_nz = matches!((src, dst), (Format::Nd, Format::FractalNz) | (Format::FractalNz, Format::Nd));
    if nd_nz || src == dst {
        return Ok(Step::Unchanged(info));
    }

    let format = if src != Format::Nd { Format::Nd } else { dst };
    let output = TensorDesc { format, sub_format: 0, ..info.src.tensor.clone() };
    let op = generator.unary_node(TransformKind::Reformat, &info, output);
    generator.splice(info, op, false)
}
