//! End-to-end pass runs over single edges.

use kiln_ir::prelude::*;

use crate::capability::AcceptAll;
use crate::config::PassConfig;
use crate::pass::{PassReport, run_trans_node_pass};
use crate::test::helpers::*;

fn run(edge: &mut Edge) -> PassReport {
    run_trans_node_pass(&mut edge.graph, &ctx(), &AcceptAll).unwrap()
}

#[test]
fn test_5hd_back_to_nchw_uses_origin_shape() {
    let mut edge = edge(
        t(Format::Nc1hwc0, DType::Float16, &[100, 256, 256, 512]).with_origin(Format::Nchw, &[100, 256, 256, 512]),
        t(Format::Nchw, DType::Float16, &[1, 256, 256, 512]),
    );
    let report = run(&mut edge);

    assert_eq!(report.nodes_inserted, 1);
    assert_eq!(edge.conversions(), ["TransData"]);
    assert_eq!(edge.incoming().to_string(), "NCHW[100,256,256,512] DT_FLOAT16");
    assert_eq!(edge.graph.node_count(), 3);
}

#[test]
fn test_dtype_only_mismatch_inserts_cast() {
    let mut edge = edge(
        t(Format::Nc1hwc0, DType::Float32, &[1, 256, 256, 512, 1]),
        t(Format::Nc1hwc0, DType::Float16, &[1, 256, 256, 512, 1]),
    );
    run(&mut edge);

    assert_eq!(edge.conversions(), ["Cast"]);
    assert!(edge.is_consistent());
}

#[test]
fn test_plain_to_plain_transposes() {
    let mut edge = edge(
        t(Format::Nchw, DType::Float16, &[1, 1024, 256, 512]),
        t(Format::Nhwc, DType::Float16, &[1, 256, 512, 1024]),
    );
    run(&mut edge);

    assert_eq!(edge.conversions(), ["TransposeD"]);
    assert_eq!(edge.incoming().to_string(), "NHWC[1,256,512,1024] DT_FLOAT16");
    assert!(edge.is_consistent());
}

#[test]
fn test_transpose_shape_comes_from_permutation() {
    let mut edge =
        edge(t(Format::Nchw, DType::Float16, &[1, 1024, 256, 512]), t(Format::Nhwc, DType::Float16, &[1, 3, 4, 2]));
    let report = run(&mut edge);

    assert_eq!(report.nodes_inserted, 1);
    assert_eq!(edge.conversions(), ["TransposeD"]);
    assert_eq!(edge.incoming().to_string(), "NHWC[1,256,512,1024] DT_FLOAT16");
    assert_eq!(edge.graph.node_count(), 3);
}

#[test]
fn test_grouped_weight_into_fractal_z() {
    let mut edge = edge(
        t(Format::Nchw, DType::Float16, &[32, 1, 3, 3]).with_sub_format(2),
        t(Format::FractalZ, DType::Float16, &[9, 2, 16, 16]).with_sub_format(2),
    );
    let report = run(&mut edge);

    assert_eq!(report.nodes_inserted, 2);
    assert_eq!(edge.conversions(), ["TransposeD", "TransData"]);
    assert_eq!(edge.graph.node_count(), 4);
    assert!(edge.is_consistent());

    let transdata = edge.graph.nodes_of_type("TransData").next().unwrap();
    let desc = edge.graph.op_desc(transdata).unwrap();
    assert_eq!(desc.input(0).unwrap().to_string(), "HWCN(g=2)[3,3,1,32] DT_FLOAT16");
    assert_eq!(desc.attr("groups"), Some(&AttrValue::Int(2)));
}

#[test]
fn test_grouped_weight_out_of_fractal_z() {
    let mut edge = edge(
        t(Format::FractalZ, DType::Float16, &[9, 2, 16, 16])
            .with_sub_format(2)
            .with_origin(Format::Nchw, &[32, 1, 3, 3]),
        t(Format::Nchw, DType::Float16, &[32, 1, 3, 3]).with_sub_format(2),
    );
    run(&mut edge);

    assert_eq!(edge.conversions(), ["TransData", "TransposeD"]);
    assert!(edge.is_consistent());
}

#[test]
fn test_unknown_rank_passes_through_transdata() {
    let mut edge =
        edge(t(Format::Nchw, DType::Float16, &[-2]), t(Format::Nc1hwc0, DType::Float16, &[1, 1, 4, 4, 16]));
    run(&mut edge);

    assert_eq!(edge.conversions(), ["TransData"]);
    assert_eq!(edge.incoming().to_string(), "NC1HWC0[-2] DT_FLOAT16");
}

#[test]
fn test_casts_around_a_node_are_not_merged() {
    let f32 = t(Format::Nchw, DType::Float32, &[1, 3, 8, 8]);
    let f16 = t(Format::Nchw, DType::Float16, &[1, 3, 8, 8]);
    let mut graph = ComputeGraph::new("casts");
    let a = graph.add_node(OpDesc::new("a", op_types::DATA).with_output(f32.clone()));
    let b = graph.add_node(unary("b", "Relu", f16.clone(), f16));
    let c = graph.add_node(OpDesc::new("c", op_types::NET_OUTPUT).with_input(f32));
    graph.add_edge(OutAnchor { node: a, index: 0 }, InAnchor { node: b, index: 0 }).unwrap();
    graph.add_edge(OutAnchor { node: b, index: 0 }, InAnchor { node: c, index: 0 }).unwrap();

    let report = run_trans_node_pass(&mut graph, &ctx(), &AcceptAll).unwrap();
    assert_eq!(report, PassReport { edges_examined: 2, edges_unchanged: 0, nodes_inserted: 2, nodes_merged: 0 });
    assert_eq!(count_of_type(&graph, "Cast"), 2);
}

/// `x -> cast(f32->f16) -> cast(f16->f32) -> y`
fn cast_round_trip() -> ComputeGraph {
    let f32 = t(Format::Nchw, DType::Float32, &[8, 8]);
    let f16 = t(Format::Nchw, DType::Float16, &[8, 8]);
    let mut graph = ComputeGraph::new("round_trip");
    let nodes = [
        graph.add_node(OpDesc::new("x", op_types::DATA).with_output(f32.clone())),
        graph.add_node(unary("down", "Cast", f32.clone(), f16.clone())),
        graph.add_node(unary("up", "Cast", f16, f32.clone())),
        graph.add_node(OpDesc::new("y", op_types::NET_OUTPUT).with_input(f32)),
    ];
    for pair in nodes.windows(2) {
        graph.add_edge(OutAnchor { node: pair[0], index: 0 }, InAnchor { node: pair[1], index: 0 }).unwrap();
    }
    graph
}

#[test]
fn test_merge_runs_after_insertion() {
    let mut graph = cast_round_trip();
    let report = run_trans_node_pass(&mut graph, &ctx(), &AcceptAll).unwrap();
    assert_eq!(report.edges_unchanged, 3);
    assert_eq!(report.nodes_merged, 2);
    assert_eq!(graph.node_count(), 2);
}

#[test]
fn test_merge_can_be_disabled() {
    let mut graph = cast_round_trip();
    let ctx = ctx_with(PassConfig::builder().merge_trans_ops(false).build());
    let report = run_trans_node_pass(&mut graph, &ctx, &AcceptAll).unwrap();
    assert_eq!(report.nodes_merged, 0);
    assert_eq!(count_of_type(&graph, "Cast"), 2);
}
