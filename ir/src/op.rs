//! Operator descriptors.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use crate::attr::AttrValue;
use crate::tensor::TensorDesc;

/// Operator type names the IR itself gives meaning to.
pub mod op_types {
    pub const DATA: &str = "Data";
    pub const CONST: &str = "Const";
    pub const CONSTANT: &str = "Constant";
    pub const VARIABLE: &str = "Variable";
    pub const NET_OUTPUT: &str = "NetOutput";
}

/// Coarse computation pattern of an operator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum OpPattern {
    Elementwise,
    Broadcast,
    Reduce,
    #[default]
    Other,
}

/// Operator description: type, port tensors and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct OpDesc {
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<TensorDesc>,
    pub outputs: Vec<TensorDesc>,
    pub attrs: BTreeMap<String, AttrValue>,
    /// Per input: the operand is a compile-time constant.
    pub const_inputs: SmallVec<[bool; 4]>,
    pub pattern: OpPattern,
}

impl OpDesc {
    pub fn new(name: impl Into<String>, op_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            op_type: op_type.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            attrs: BTreeMap::new(),
            const_inputs: SmallVec::new(),
            pattern: OpPattern::default(),
        }
    }

    pub fn with_input(mut self, desc: TensorDesc) -> Self {
        self.add_input(desc);
        self
    }

    pub fn with_output(mut self, desc: TensorDesc) -> Self {
        self.outputs.push(desc);
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn with_pattern(mut self, pattern: OpPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn add_input(&mut self, desc: TensorDesc) {
        self.inputs.push(desc);
        self.const_inputs.push(false);
    }

    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attrs.insert(name.into(), value.into());
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }

    pub fn input(&self, index: usize) -> Option<&TensorDesc> {
        self.inputs.get(index)
    }

    pub fn output(&self, index: usize) -> Option<&TensorDesc> {
        self.outputs.get(index)
    }

    /// Mark input `index` as a compile-time constant operand.
    pub fn mark_const_input(&mut self, index: usize) {
        if self.const_inputs.len() <= index {
            self.const_inputs.resize(index + 1, false);
        }
        self.const_inputs[index] = true;
    }

    pub fn is_const_input(&self, index: usize) -> bool {
        self.const_inputs.get(index).copied().unwrap_or(false)
    }

    /// Constant and variable producers: their tensors carry no authored provenance.
    pub fn is_constant(&self) -> bool {
        matches!(self.op_type.as_str(), op_types::CONST | op_types::CONSTANT | op_types::VARIABLE)
    }
}
