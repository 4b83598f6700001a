use kiln_ir::prelude::*;
use test_case::test_case;

use crate::capability::AcceptAll;
use crate::config::PassConfig;
use crate::context::PassContext;
use crate::error::Error;
use crate::generator::{Step, add_trans_node, squeeze_axes};
use crate::strategy::TransformKind;
use crate::test::helpers::*;

fn run(kind: TransformKind, edge: &mut Edge, ctx: &PassContext) -> Step {
    let info = edge.info(ctx);
    add_trans_node(kind, &mut edge.graph, ctx, &AcceptAll, info).unwrap()
}

/// Descriptor of the node a spliced step starts from.
fn inserted<'a>(edge: &'a Edge, step: &Step) -> &'a OpDesc {
    assert!(step.is_spliced(), "expected a spliced node");
    edge.graph.op_desc(step.info().src_anchor.node).unwrap()
}

#[test]
fn test_cast_changes_dtype_only() {
    let ctx = ctx();
    let mut edge = edge(t(Format::Nchw, DType::Float32, &[1, 3, 8, 8]), t(Format::Nchw, DType::Float16, &[1, 3, 8, 8]));
    let step = run(TransformKind::Cast, &mut edge, &ctx);

    let cast = inserted(&edge, &step);
    assert_eq!(cast.name, "trans_Cast_0");
    assert_eq!(cast.attr("dst_type"), Some(&AttrValue::Int(DType::Float16 as i64)));
    assert_eq!(cast.attr("_need_compile"), Some(&AttrValue::Bool(true)));
    assert_eq!(cast.input(0).unwrap().dtype, DType::Float32);
    assert_eq!(cast.output(0).unwrap().to_string(), "NCHW[1,3,8,8] DT_FLOAT16");
    assert_eq!(edge.conversions(), ["Cast"]);
    assert!(step.info().is_consistent());
}

#[test]
fn test_cast_skipped_for_equal_dtypes() {
    let ctx = ctx();
    let mut edge = edge(t(Format::Nchw, DType::Float32, &[1, 3, 8, 8]), t(Format::Nhwc, DType::Float32, &[1, 8, 8, 3]));
    let step = run(TransformKind::Cast, &mut edge, &ctx);
    assert!(!step.is_spliced());
    assert_eq!(edge.graph.node_count(), 2);
}

#[test_case(true, 1; "checked")]
#[test_case(false, 0; "disabled")]
fn test_cast_accuracy_query(accuracy_check: bool, queries: usize) {
    let ctx = ctx_with(PassConfig::builder().accuracy_check(accuracy_check).build());
    let mut edge = edge(t(Format::Nd, DType::Float32, &[8]), t(Format::Nd, DType::Float16, &[8]));
    let capability = Rejecting::new(&[]);
    let info = edge.info(&ctx);

    let step = add_trans_node(TransformKind::Cast, &mut edge.graph, &ctx, &capability, info).unwrap();
    assert!(step.is_spliced());
    assert_eq!(capability.accuracy_queries(), queries);
}

#[test]
fn test_unsupported_node_leaves_edge_alone() {
    let ctx = ctx();
    let mut edge = edge(t(Format::Nd, DType::Float32, &[8]), t(Format::Nd, DType::Float16, &[8]));
    let info = edge.info(&ctx);

    let step = add_trans_node(TransformKind::Cast, &mut edge.graph, &ctx, &Rejecting::new(&["Cast"]), info).unwrap();
    assert!(!step.is_spliced());
    assert_eq!(step.info().src_anchor, edge.src_anchor());
    assert_eq!(edge.graph.node_count(), 2);
    assert_eq!(edge.graph.peer_out(edge.dst_anchor()), Some(edge.src_anchor()));
}

#[test]
fn test_reshape_feeds_target_shape_from_const() {
    let ctx = ctx();
    let mut edge =
        edge(t(Format::Nd, DType::Float32, &[16]), t(Format::Nc1hwc0, DType::Float32, &[1, 1, 1, 1, 16]));
    let step = run(TransformKind::Reshape, &mut edge, &ctx);

    let reshape = inserted(&edge, &step);
    assert_eq!(reshape.name, "trans_Reshape_0");
    assert_eq!(reshape.output(0).unwrap().to_string(), "ND[1,16,1,1] DT_FLOAT");
    assert_eq!(reshape.input(1).unwrap().to_string(), "ND[4] DT_INT32");
    assert!(reshape.is_const_input(1));
    assert!(!reshape.is_const_input(0));

    let constant = edge.graph.find_node("trans_Const_1").unwrap();
    let desc = edge.graph.op_desc(constant).unwrap();
    assert_eq!(desc.op_type, op_types::CONST);
    assert_eq!(desc.attr("value").and_then(AttrValue::as_int32_tensor), Some(&[1, 16, 1, 1][..]));

    let shape_input = edge.graph.in_anchor(step.info().src_anchor.node, 1).unwrap();
    assert_eq!(edge.graph.peer_out(shape_input), Some(OutAnchor { node: constant, index: 0 }));
    assert_eq!(edge.graph.node_count(), 4);
}

#[test]
fn test_reshape_keeps_element_count() {
    let ctx = ctx();
    let mut edge = edge(t(Format::Nchw, DType::Float32, &[2, 3, 4, 5]), t(Format::Nchw, DType::Float32, &[1, 3, 4, 5]));
    assert!(!run(TransformKind::Reshape, &mut edge, &ctx).is_spliced());
}

#[test]
fn test_transpose_permutes_shape() {
    let ctx = ctx();
    let mut edge = edge(
        t(Format::Nchw, DType::Float16, &[1, 1024, 256, 512]),
        t(Format::Nhwc, DType::Float16, &[1, 256, 512, 1024]),
    );
    let step = run(TransformKind::Transpose, &mut edge, &ctx);

    let transpose = inserted(&edge, &step);
    assert_eq!(transpose.op_type, "TransposeD");
    assert_eq!(transpose.attr("perm").and_then(AttrValue::as_ints), Some(&[0, 2, 3, 1][..]));
    assert!(step.info().is_consistent());
}

#[test]
fn test_transpose_without_permutation_relabels() {
    let ctx = ctx();
    let mut edge =
        edge(t(Format::Nchw, DType::Float16, &[1, 2, 3, 4]), t(Format::Ndhwc, DType::Float16, &[1, 2, 3, 4, 5]));
    let step = run(TransformKind::Transpose, &mut edge, &ctx);

    let transpose = inserted(&edge, &step);
    assert_eq!(transpose.attr("perm"), None);
    assert_eq!(transpose.output(0).unwrap().to_string(), "NDHWC[1,2,3,4] DT_FLOAT16");
}

#[test_case(Format::Nchw, Format::FractalZnLstm, &[1, 1, 4, 4, 16]; "into hardware format")]
#[test_case(Format::Nchw, Format::Nd, &[1, 16, 4, 4]; "into nd")]
fn test_transpose_leaves_non_axis_formats_to_layout_steps(src: Format, dst: Format, dst_shape: &[i64]) {
    let ctx = ctx();
    let mut edge = edge(t(src, DType::Float16, &[1, 16, 4, 4]), t(dst, DType::Float16, dst_shape));
    let step = run(TransformKind::Transpose, &mut edge, &ctx);

    assert!(!step.is_spliced());
    assert_eq!(step.info().src.tensor.format, src);
    assert_eq!(edge.graph.node_count(), 2);
}

#[test_case(Format::Nchw, Format::Nd, Some(Format::Nd); "plain to nd")]
#[test_case(Format::Nd, Format::Nhwc, Some(Format::Nhwc); "nd to plain")]
#[test_case(Format::Nchw, Format::FractalNz, Some(Format::Nd); "towards nz stops at nd")]
#[test_case(Format::Nd, Format::FractalNz, None; "nd to nz needs transdata")]
#[test_case(Format::FractalNz, Format::Nd, None; "nz to nd needs transdata")]
fn test_reformat(src: Format, dst: Format, expected: Option<Format>) {
    let ctx = ctx();
    let dims = [1, 1, 32, 64];
    let mut edge = edge(t(src, DType::Float16, &dims), t(dst, DType::Float16, &dims));
    let step = run(TransformKind::Reformat, &mut edge, &ctx);

    let produced = step.is_spliced().then(|| step.info().src.tensor.format);
    assert_eq!(produced, expected);
    if step.is_spliced() {
        assert_eq!(step.info().src.tensor.shape.as_slice(), &dims);
        assert_eq!(inserted(&edge, &step).op_type, "ReFormat");
    }
}

#[test]
fn test_squeeze_drops_unit_axes() {
    let ctx = ctx();
    let mut edge = edge(t(Format::Nchw, DType::Float32, &[1, 3, 1, 1]), t(Format::Nchw, DType::Float32, &[3]));
    let step = run(TransformKind::SqueezeV2, &mut edge, &ctx);

    let squeeze = inserted(&edge, &step);
    assert_eq!(squeeze.attr("axis").and_then(AttrValue::as_ints), Some(&[0, 2, 3][..]));
    assert!(step.info().is_consistent());
}

#[test]
fn test_squeeze_respects_rank_gap() {
    let ctx = ctx_with(PassConfig::builder().squeeze_rank_gap(2).build());
    let mut edge = edge(t(Format::Nchw, DType::Float32, &[1, 3, 1, 1]), t(Format::Nchw, DType::Float32, &[3]));
    assert!(!run(TransformKind::SqueezeV2, &mut edge, &ctx).is_spliced());
}

#[test]
fn test_squeeze_needs_identifiable_destination() {
    let ctx = ctx();
    let mut edge = edge(t(Format::Nchw, DType::Float32, &[1, 3, 1, 1]), t(Format::Nd, DType::Float32, &[3]));
    assert!(!run(TransformKind::SqueezeV2, &mut edge, &ctx).is_spliced());
}

#[test_case(&[1, 3, 1, 1], &[3], Some(vec![0, 2, 3]); "around channel")]
#[test_case(&[2, 1, 3], &[2, 3], Some(vec![1]); "middle")]
#[test_case(&[1, 1], &[1], Some(vec![1]); "equal ones match first")]
#[test_case(&[1, 3], &[3, 1], None; "order differs")]
#[test_case(&[2, 3], &[3], None; "non unit axis")]
fn test_squeeze_axes(long: &[i64], short: &[i64], expected: Option<Vec<i64>>) {
    assert_eq!(squeeze_axes(long, short), expected);
}

#[test]
fn test_unsqueeze_uses_reshape_type() {
    let ctx = ctx();
    let mut edge = edge(
        t(Format::Nchw, DType::Float16, &[3]).with_reshape_type("C"),
        t(Format::Nc1hwc0, DType::Float16, &[1, 1, 1, 1, 16]),
    );
    let step = run(TransformKind::UnsqueezeV2, &mut edge, &ctx);

    let unsqueeze = inserted(&edge, &step);
    assert_eq!(unsqueeze.attr("axis").and_then(AttrValue::as_ints), Some(&[0, 2, 3][..]));
    assert_eq!(unsqueeze.output(0).unwrap().to_string(), "NCHW[1,3,1,1] DT_FLOAT16");
}

#[test]
fn test_unsqueeze_skips_nd_source() {
    let ctx = ctx();
    let mut edge =
        edge(t(Format::Nd, DType::Float16, &[16]), t(Format::Nc1hwc0, DType::Float16, &[1, 1, 1, 1, 16]));
    assert!(!run(TransformKind::UnsqueezeV2, &mut edge, &ctx).is_spliced());
}

#[test]
fn test_unsqueeze_respects_rank_gap() {
    let ctx = ctx_with(PassConfig::builder().squeeze_rank_gap(2).build());
    let mut edge = edge(
        t(Format::Nchw, DType::Float16, &[3]).with_reshape_type("C"),
        t(Format::Nc1hwc0, DType::Float16, &[1, 1, 1, 1, 16]),
    );
    assert!(!run(TransformKind::UnsqueezeV2, &mut edge, &ctx).is_spliced());
}

#[test]
fn test_transdata_restores_origin_shape() {
    let ctx = ctx();
    let mut edge = edge(
        t(Format::Nc1hwc0, DType::Float16, &[1, 1, 4, 4, 16]).with_origin(Format::Nchw, &[1, 16, 4, 4]),
        t(Format::Nchw, DType::Float16, &[1, 16, 4, 4]),
    );
    let step = run(TransformKind::TransData, &mut edge, &ctx);

    let transdata = inserted(&edge, &step);
    assert_eq!(transdata.attr("src_format").and_then(AttrValue::as_str), Some("NC1HWC0"));
    assert_eq!(transdata.attr("dst_format").and_then(AttrValue::as_str), Some("NCHW"));
    assert_eq!(transdata.attr("groups"), None);
    assert!(step.info().is_consistent());
}

#[test]
fn test_transdata_passes_unknown_rank() {
    let ctx = ctx();
    let mut edge =
        edge(t(Format::Nchw, DType::Float16, &[-2]), t(Format::Nc1hwc0, DType::Float16, &[1, 1, 4, 4, 16]));
    let step = run(TransformKind::TransData, &mut edge, &ctx);
    assert_eq!(inserted(&edge, &step).output(0).unwrap().to_string(), "NC1HWC0[-2] DT_FLOAT16");
}

#[test]
fn test_transdata_regroups_through_hwcn() {
    let ctx = ctx();
    let mut edge = edge(
        t(Format::FractalZ, DType::Float16, &[9, 2, 16, 16])
            .with_sub_format(2)
            .with_origin(Format::Nchw, &[32, 1, 3, 3]),
        t(Format::Nchw, DType::Float16, &[32, 1, 3, 3]).with_sub_format(2),
    );
    let step = run(TransformKind::TransData, &mut edge, &ctx);

    let transdata = inserted(&edge, &step);
    assert_eq!(transdata.output(0).unwrap().to_string(), "HWCN[3,3,1,32] DT_FLOAT16");
    assert_eq!(transdata.attr("groups"), Some(&AttrValue::Int(2)));
}

#[test]
fn test_transdata_without_shape_rule() {
    let ctx = ctx();
    let mut edge = edge(
        t(Format::FractalZ, DType::Float16, &[9, 2, 16, 16]).with_sub_format(2).with_origin(Format::Nd, &[32, 1, 3, 3]),
        t(Format::Nchw, DType::Float16, &[32, 1, 3, 3]).with_sub_format(2),
    );
    let info = edge.info(&ctx);

    let err = add_trans_node(TransformKind::TransData, &mut edge.graph, &ctx, &AcceptAll, info).unwrap_err();
    assert!(matches!(
        &err,
        Error::NoShapeRule { consumer, src: Format::FractalZ, target: Format::Hwcn } if consumer == "dst"
    ));
    assert_eq!(edge.graph.node_count(), 2);
}

#[test]
fn test_transdata_rnn_copies_cell_sizes() {
    let ctx = ctx();
    let mut edge = edge_between(
        OpDesc::new("weight", "Conv2D")
            .with_output(t(Format::Nd, DType::Float16, &[4, 8]))
            .with_attr("hidden_size", 2i64),
        OpDesc::new("rnn", "DynamicRNN")
            .with_input(t(Format::FractalZnRnn, DType::Float16, &[1, 1, 16, 16]))
            .with_attr("input_size", 4i64)
            .with_attr("hidden_size", 8i64),
    );
    let step = run(TransformKind::TransDataRnn, &mut edge, &ctx);

    let transdata = inserted(&edge, &step);
    assert_eq!(transdata.op_type, "TransDataRNN");
    assert_eq!(transdata.attr("input_size"), Some(&AttrValue::Int(4)));
    assert_eq!(transdata.attr("hidden_size"), Some(&AttrValue::Int(8)));
    assert!(step.info().is_consistent());
}

#[test]
fn test_transdata_rnn_falls_back_to_producer_attrs() {
    let ctx = ctx();
    let mut edge = edge_between(
        OpDesc::new("rnn", "DynamicRNN")
            .with_output(t(Format::FractalZnRnn, DType::Float16, &[1, 1, 16, 16]))
            .with_attr("hidden_size", 8i64),
        OpDesc::new("out", "Relu").with_input(t(Format::Nd, DType::Float16, &[4, 8])),
    );
    let step = run(TransformKind::TransDataRnn, &mut edge, &ctx);

    let transdata = inserted(&edge, &step);
    assert_eq!(transdata.attr("hidden_size"), Some(&AttrValue::Int(8)));
    assert_eq!(transdata.attr("input_size"), None);
}

#[test]
fn test_forbidden_kind_fails() {
    let ctx = ctx();
    let mut edge = edge(
        t(Format::Nc1hwc0, DType::Float16, &[1, 1, 3, 3, 16]),
        t(Format::FractalZ, DType::Float16, &[9, 1, 16, 16]),
    );
    let info = edge.info(&ctx);
    let err = add_trans_node(TransformKind::Forbidden, &mut edge.graph, &ctx, &AcceptAll, info).unwrap_err();
    assert!(matches!(err, Error::ForbiddenStrategy { src: Format::Nc1hwc0, dst: Format::FractalZ, .. }));
}

#[test]
fn test_inserted_nodes_carry_origin_provenance() {
    let ctx = ctx();
    let src = TensorDesc {
        origin_name: Some("conv1:0".to_string()),
        ..t(Format::Nc1hwc0, DType::Float32, &[1, 1, 4, 4, 16]).with_origin(Format::Nchw, &[1, 16, 4, 4])
    };
    let mut edge = edge(src, t(Format::Nchw, DType::Float16, &[1, 16, 4, 4]));
    let step = run(TransformKind::TransData, &mut edge, &ctx);
    let info = step.into_info();
    let step = add_trans_node(TransformKind::Cast, &mut edge.graph, &ctx, &AcceptAll, info).unwrap();

    let cast = inserted(&edge, &step);
    for desc in [cast.input(0).unwrap(), cast.output(0).unwrap()] {
        assert_eq!(desc.origin_format, Format::Nchw);
        assert_eq!(desc.origin_shape.as_slice(), &[1, 16, 4, 4]);
        assert_eq!(desc.origin_name.as_deref(), Some("conv1:0"));
    }
    assert_eq!(edge.conversions(), ["TransData", "Cast"]);
}
