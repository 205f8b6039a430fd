//! Declared composite types
//!
//! A [`Declaration`] is the platform-independent half of a struct or union:
//! its name, kind and ordered fields. It carries no offsets; those live in the
//! per-platform [`Layout`](crate::layout::Layout) computed from it.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::data::Data;
use crate::error::{Error, Result};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a declaration, unique for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompositeKind {
    Struct { packed: bool, virtual_table: bool },
    Union,
}

/// A named [`Data`] inside a declaration
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    data: Data,
}

impl Field {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Data {
        &self.data
    }
}

#[derive(Debug)]
pub struct Declaration {
    id: DeclId,
    name: String,
    kind: CompositeKind,
    fields: Vec<Field>,
}

impl Declaration {
    /// Start declaring a struct
    pub fn structure(name: impl Into<String>) -> DeclarationBuilder {
        DeclarationBuilder::new(
            name.into(),
            CompositeKind::Struct {
                packed: false,
                virtual_table: false,
            },
        )
    }

    /// Start declaring a union
    pub fn union(name: impl Into<String>) -> DeclarationBuilder {
        DeclarationBuilder::new(name.into(), CompositeKind::Union)
    }

    pub fn id(&self) -> DeclId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> CompositeKind {
        self.kind
    }

    pub fn is_union(&self) -> bool {
        self.kind == CompositeKind::Union
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Builder returned by [`Declaration::structure`] and [`Declaration::union`]
#[derive(Debug, Clone)]
pub struct DeclarationBuilder {
    name: String,
    kind: CompositeKind,
    fields: Vec<Field>,
}

impl DeclarationBuilder {
    fn new(name: String, kind: CompositeKind) -> Self {
        Self {
            name,
            kind,
            fields: Vec::new(),
        }
    }

    /// Append a field; declaration order is layout order
    pub fn field(mut self, name: impl Into<String>, data: Data) -> Self {
        self.fields.push(Field {
            name: name.into(),
            data,
        });
        self
    }

    /// Omit inter-field padding (structs only)
    pub fn packed(mut self, enabled: bool) -> Self {
        if let CompositeKind::Struct { packed, .. } = &mut self.kind {
            *packed = enabled;
        }
        self
    }

    /// Reserve a vtable pointer slot ahead of the fields (structs only)
    pub fn virtual_table(mut self, enabled: bool) -> Self {
        if let CompositeKind::Struct { virtual_table, .. } = &mut self.kind {
            *virtual_table = enabled;
        }
        self
    }

    pub fn build(self) -> Result<Arc<Declaration>> {
        if self.name.is_empty() {
            return Err(Error::definition("<anonymous>", "type name must not be empty"));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(Error::definition(&self.name, "field name must not be empty"));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::definition(
                    &self.name,
                    format!("duplicate field `{}`", field.name),
                ));
            }
        }

        Ok(Arc::new(Declaration {
            id: DeclId(NEXT_ID.fetch_add(1, Ordering::Relaxed)),
            name: self.name,
            kind: self.kind,
            fields: self.fields,
        }))
    }
}
