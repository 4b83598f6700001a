use proptest::prelude::*;

use crate::prelude::*;

fn tensor() -> TensorDesc {
    TensorDesc::new(Format::Nd, DType::Float32, &[4])
}

proptest! {
    /// Inserting `n` nodes into a single edge yields a chain that orders topologically.
    #[test]
    fn insert_between_builds_a_chain(n in 1usize..12) {
        let mut graph = ComputeGraph::new("chain");
        let src = graph.add_node(OpDesc::new("src", op_types::DATA).with_output(tensor()));
        let dst = graph.add_node(OpDesc::new("dst", op_types::NET_OUTPUT).with_input(tensor()));
        let dst_in = InAnchor { node: dst, index: 0 };
        graph.add_edge(OutAnchor { node: src, index: 0 }, dst_in).unwrap();

        for i in 0..n {
            let node = graph.add_node(OpDesc::new(format!("t{i}"), "Cast").with_input(tensor()).with_output(tensor()));
            let producer = graph.peer_out(dst_in).unwrap();
            graph.insert_between(producer, dst_in, node).unwrap();
        }

        let order = graph.topological_order().unwrap();
        prop_assert_eq!(order.len(), n + 2);
        prop_assert_eq!(order.first().copied(), Some(src));
        prop_assert_eq!(order.last().copied(), Some(dst));
        prop_assert_eq!(graph.data_edges().len(), n + 1);
    }
}
