//! Native state-change descriptor and its field schema.
//!
//! The engine hands a `StateDescriptor` to the registered callback on every
//! state access. For GET accesses the callback writes the resulting value
//! back into it before returning.

use super::HandleId;

/// Kind of a field exposed by the descriptor schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Opaque handle of the switch being accessed
    Handle,
    /// Raw tri-state value (1 = on, 0 = off, anything else passthrough)
    Value,
}

/// A named field in the descriptor schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Field layout of a [`StateDescriptor`].
#[derive(Debug)]
pub struct DescriptorSchema {
    pub fields: &'static [FieldSpec],
}

static STATE_DESCRIPTOR_SCHEMA: DescriptorSchema = DescriptorSchema {
    fields: &[
        FieldSpec {
            name: "handle",
            kind: FieldKind::Handle,
        },
        FieldSpec {
            name: "value",
            kind: FieldKind::Value,
        },
    ],
};

/// Process-wide descriptor schema. Constant; safe to fetch on every access.
pub fn state_descriptor_schema() -> &'static DescriptorSchema {
    &STATE_DESCRIPTOR_SCHEMA
}

/// A field read out of a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Handle(HandleId),
    Value(i32),
}

/// Native description of a single state access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDescriptor {
    handle: HandleId,
    value: i32,
}

impl StateDescriptor {
    pub fn new(handle: HandleId, value: i32) -> Self {
        Self { handle, value }
    }

    pub fn handle(&self) -> HandleId {
        self.handle
    }

    pub fn value(&self) -> i32 {
        self.value
    }

    /// Read the field described by `field`.
    pub fn read(&self, field: &FieldSpec) -> FieldValue {
        match field.kind {
            FieldKind::Handle => FieldValue::Handle(self.handle),
            FieldKind::Value => FieldValue::Value(self.value),
        }
    }

    /// Store the value produced by a GET access.
    pub fn write_back(&mut self, value: i32) {
        self.value = value;
    }
}
