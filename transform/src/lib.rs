//! Conversion-node insertion for kiln compute graphs.
//!
//! After kernel selection every node carries the exact format, dtype and shape
//! its kernel wants. Neighbouring nodes often disagree; this crate makes every
//! data edge consistent by splicing conversion operators (`Cast`, `Reshape`,
//! `TransposeD`, `ReFormat`, `SqueezeV2`, `UnsqueezeV2`, `TransData`,
//! `TransDataRNN`) between them, then cancels adjacent inverse pairs.
//!
//! # Module Organization
//!
//! - [`strategy`] - Strategy ids and the table mapping format pairs to conversion sequences
//! - [`axis`] - Axis-letter mapping, shape expansion and squeeze
//! - [`generator`] - One generator per conversion kind
//! - [`insertion`] - Per-edge orchestration and edge selection policies
//! - [`merging`] - Removal of mutually inverse conversion pairs
//! - [`pass`] - Pass entry point
//! - [`config`], [`context`], [`capability`] - Configuration, per-run state and the kernel capability interface
//!
//! # Example
//!
//! ```rust,ignore
//! use kiln_transform::{AcceptAll, PassConfig, PassContext, run_trans_node_pass};
//!
//! let ctx = PassContext::new(PassConfig::from_env());
//! let report = run_trans_node_pass(&mut graph, &ctx, &AcceptAll)?;
//! ```

pub mod axis;
pub mod capability;
pub mod config;
pub mod context;
pub mod error;
pub mod generator;
pub mod insertion;
pub mod merging;
pub mod pass;
pub mod strategy;
pub mod transfer_info;


pub use capability::{AcceptAll, CachedCapability, KernelCapability, Support};
pub use config::{InsertionPolicy, PassConfig};
pub use context::{NameCounter, PassContext};
pub use error::{Error, Result};
pub use generator::{Step, add_trans_node};
pub use insertion::{EdgeOutcome, EdgeState, TransNodeInsertion};
pub use merging::merge_all_trans_ops;
pub use pass::{PassReport, run_trans_node_pass};
pub use strategy::{Lookup, StrategyId, StrategyTable, TransformKind, TransposeTable};
pub use transfer_info::{Endpoint, TransferInfo};
