//! Per-platform composite layout
//!
//! [`compute_layout`] reproduces the C layout rules for a declaration under
//! one [`PlatformConfig`]:
//!
//! - natural structs pad each field to its own alignment and round the total
//!   size up to the largest field alignment
//! - packed structs place fields back to back with alignment 1
//! - unions place every field at offset 0
//!
//! Virtual structs additionally reserve a pointer-sized vtable slot at
//! offset 0. The result is an immutable [`Layout`]; callers normally obtain it
//! through [`LayoutCache`] rather than calling this directly.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::trace;

use crate::cache::LayoutCache;
use crate::data::{Data, offset_address};
use crate::decl::{CompositeKind, Declaration};
use crate::error::{Error, Result};
use crate::instance::Instance;
use crate::platform::PlatformConfig;
use crate::value::Value;

/// Alignment of a struct or union with no fields
pub const DEFAULT_ALIGNMENT: usize = 1;

/// Size of a union with no fields
pub const DEFAULT_SIZE: usize = 0;

/// A field with its computed offset
///
/// Also serves as the accessor for that field: [`get`](Self::get) and
/// [`set`](Self::set) work on any instance bound to the layout the field
/// came from.
#[derive(Debug, Clone)]
pub struct FieldLayout {
    name: String,
    data: Data,
    offset: usize,
    size: usize,
    alignment: usize,
}

impl FieldLayout {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &Data {
        &self.data
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    /// Absolute address of this field inside `instance`
    pub fn address(&self, instance: &Instance) -> Result<u64> {
        offset_address(instance.address(), self.offset)
    }

    pub fn get(&self, instance: &Instance) -> Result<Value> {
        let address = self.address(instance)?;
        trace!("get {}.{} at {:#x}", instance.layout().name(), self.name, address);
        self.data
            .read(instance.cache(), instance.state(), address, instance.order())
    }

    pub fn set(&self, instance: &Instance, value: impl Into<Value>) -> Result<()> {
        let address = self.address(instance)?;
        trace!("set {}.{} at {:#x}", instance.layout().name(), self.name, address);
        self.data.write(
            instance.cache(),
            instance.state(),
            address,
            &value.into(),
            instance.order(),
        )
    }
}

/// Concrete layout of a declaration under one platform config
#[derive(Debug)]
pub struct Layout {
    declaration: Arc<Declaration>,
    config: PlatformConfig,
    size: usize,
    alignment: usize,
    packed: bool,
    vtable: bool,
    fields: Vec<FieldLayout>,
    index: HashMap<String, usize>,
}

impl Layout {
    pub fn declaration(&self) -> &Arc<Declaration> {
        &self.declaration
    }

    pub fn name(&self) -> &str {
        self.declaration.name()
    }

    pub fn config(&self) -> PlatformConfig {
        self.config
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }

    pub fn is_packed(&self) -> bool {
        self.packed
    }

    pub fn is_union(&self) -> bool {
        self.declaration.is_union()
    }

    /// Whether offset 0 holds a vtable pointer
    pub fn has_vtable(&self) -> bool {
        self.vtable
    }

    pub fn fields(&self) -> &[FieldLayout] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Like [`field`](Self::field), failing with [`Error::UnknownField`]
    pub fn accessor(&self, name: &str) -> Result<&FieldLayout> {
        self.field(name).ok_or_else(|| Error::UnknownField {
            type_name: self.name().to_string(),
            field: name.to_string(),
        })
    }
}

fn align_up(cursor: usize, alignment: usize) -> Option<usize> {
    match cursor % alignment {
        0 => Some(cursor),
        rem => cursor.checked_add(alignment - rem),
    }
}

/// Measure one field, attributing definition failures to the enclosing type
fn measure(
    declaration: &Declaration,
    name: &str,
    data: &Data,
    cache: &LayoutCache,
    config: PlatformConfig,
) -> Result<(usize, usize)> {
    let measured = data
        .size(cache, config)
        .and_then(|size| Ok((size, data.alignment(cache, config)?)));

    measured.map_err(|err| match err {
        Error::Definition { type_name, reason } => Error::definition(
            declaration.name(),
            format!("field `{}` of type `{}`: {}", name, type_name, reason),
        ),
        other => other,
    })
}

/// Compute the layout of `declaration` for `config`
///
/// Nested composites are resolved through `cache`, so their layouts are
/// shared with every other user of the same cache.
pub fn compute_layout(
    declaration: &Arc<Declaration>,
    cache: &LayoutCache,
    config: PlatformConfig,
) -> Result<Layout> {
    let mut measured = Vec::with_capacity(declaration.fields().len());
    for field in declaration.fields() {
        let (size, alignment) = measure(declaration, field.name(), field.data(), cache, config)?;
        measured.push((field, size, alignment));
    }

    let (packed, vtable) = match declaration.kind() {
        CompositeKind::Struct {
            packed,
            virtual_table,
        } => (packed, virtual_table),
        CompositeKind::Union => (false, false),
    };

    let overflow = || Error::definition(declaration.name(), "layout size overflows");

    let mut fields = Vec::with_capacity(measured.len());
    let (size, alignment) = if declaration.is_union() {
        for &(field, size, alignment) in &measured {
            fields.push(place(field.name(), field.data(), 0, size, alignment));
        }
        let size = measured
            .iter()
            .map(|&(_, size, _)| size)
            .max()
            .unwrap_or(DEFAULT_SIZE);
        let alignment = measured
            .iter()
            .map(|&(_, _, alignment)| alignment)
            .max()
            .unwrap_or(DEFAULT_ALIGNMENT)
            .max(DEFAULT_ALIGNMENT);
        (size, alignment)
    } else {
        let mut cursor = if vtable { config.pointer_size() } else { 0 };

        if packed {
            for &(field, size, alignment) in &measured {
                fields.push(place(field.name(), field.data(), cursor, size, alignment));
                cursor = cursor.checked_add(size).ok_or_else(overflow)?;
            }
            (cursor, DEFAULT_ALIGNMENT)
        } else {
            let vtable_alignment = vtable.then(|| config.pointer_size());
            let alignment = measured
                .iter()
                .map(|&(_, _, alignment)| alignment)
                .chain(vtable_alignment)
                .max()
                .unwrap_or(DEFAULT_ALIGNMENT)
                .max(DEFAULT_ALIGNMENT);

            for &(field, size, field_alignment) in &measured {
                if field_alignment > 0 {
                    cursor = align_up(cursor, field_alignment).ok_or_else(overflow)?;
                }
                fields.push(place(
                    field.name(),
                    field.data(),
                    cursor,
                    size,
                    field_alignment,
                ));
                cursor = cursor.checked_add(size).ok_or_else(overflow)?;
            }
            (align_up(cursor, alignment).ok_or_else(overflow)?, alignment)
        }
    };

    let index = fields
        .iter()
        .enumerate()
        .map(|(i, field)| (field.name.clone(), i))
        .collect();

    Ok(Layout {
        declaration: Arc::clone(declaration),
        config,
        size,
        alignment,
        packed,
        vtable,
        fields,
        index,
    })
}

fn place(name: &str, data: &Data, offset: usize, size: usize, alignment: usize) -> FieldLayout {
    FieldLayout {
        name: name.to_string(),
        data: data.clone(),
        offset,
        size,
        alignment,
    }
}
