//! Kernel capability interface.
//!
//! The pass asks the kernel store whether each conversion node it is about to
//! insert can actually be compiled. A negative answer is a soft, edge-local
//! failure: the node is skipped and the edge keeps its previous state.

use kiln_dtype::DType;
use kiln_ir::{Dims, Format, OpDesc};
use papaya::HashMap;

/// Verdict of a capability query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Support {
    Supported,
    Unsupported { reason: String },
}

impl Support {
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::Unsupported { reason: reason.into() }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Self::Supported)
    }
}

/// Read-only view of the kernel store.
pub trait KernelCapability {
    /// Whether a kernel exists for `op` as described.
    fn check_supported(&self, op: &OpDesc) -> Support;

    /// Whether a kernel for `op` meets precision requirements. `real_query`
    /// forces the store to consult the kernel rather than a coarse rule.
    fn check_accuracy_supported(&self, op: &OpDesc, real_query: bool) -> Support;
}

/// Capability store that supports every operator.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl KernelCapability for AcceptAll {
    fn check_supported(&self, _op: &OpDesc) -> Support {
        Support::Supported
    }

    fn check_accuracy_supported(&self, _op: &OpDesc, _real_query: bool) -> Support {
        Support::Supported
    }
}

/// Operator identity as far as kernel selection is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OpSignature {
    op_type: String,
    inputs: Vec<(Format, u32, DType, Dims)>,
    outputs: Vec<(Format, u32, DType, Dims)>,
}

impl OpSignature {
    pub fn of(op: &OpDesc) -> Self {
        let port = |t: &kiln_ir::TensorDesc| (t.format, t.groups(), t.dtype, t.shape.clone());
        Self {
            op_type: op.op_type.clone(),
            inputs: op.inputs.iter().map(port).collect(),
            outputs: op.outputs.iter().map(port).collect(),
        }
    }
}

/// Memoizes accuracy verdicts of an inner store by operator signature.
///
/// The memo is a lock-free map, so one instance can be shared by passes
/// running on several threads.
pub struct CachedCapability<C> {
    inner: C,
    accuracy: HashMap<(OpSignature, bool), Support>,
}

impl<C> CachedCapability<C> {
    pub fn new(inner: C) -> Self {
        Self { inner, accuracy: HashMap::new() }
    }

    /// Number of memoized accuracy verdicts.
    pub fn cached(&self) -> usize {
        self.accuracy.len()
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }
}

impl<C: KernelCapability> KernelCapability for CachedCapability<C> {
    fn check_supported(&self, op: &OpDesc) -> Support {
        self.inner.check_supported(op)
    }

    fn check_accuracy_supported(&self, op: &OpDesc, real_query: bool) -> Support {
        let key = (OpSignature::of(op), real_query);
        let guard = self.accuracy.guard();

        if let Some(cached) = self.accuracy.get(&key, &guard) {
            return cached.clone();
        }

        let verdict = self.inner.check_accuracy_supported(op, real_query);

        // Another thread may have answered the same query meanwhile; keep its verdict.
        use papaya::{Compute, Operation};
        match self.accuracy.compute(
            key,
            |entry| match entry {
                Some((_, existing)) => Operation::Abort(existing.clone()),
                None => Operation::Insert(verdict.clone()),
            },
            &guard,
        ) {
            Compute::Inserted(_, value) => value.clone(),
            Compute::Aborted(existing) => existing,
            _ => verdict,
        }
    }
}
