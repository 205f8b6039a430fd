//! Live views over backing memory
//!
//! An [`Instance`] is nothing more than a layout bound to
//! `(state, address, byte order)`. It owns no storage and caches no values:
//! every access goes to the state, so two reads of the same field may differ
//! if the target changed in between. Grouping several accesses into an
//! atomic unit is up to the caller.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Number, Value as Json};

use crate::cache::LayoutCache;
use crate::data::{Data, offset_address};
use crate::decl::Declaration;
use crate::error::{Error, Result};
use crate::layout::Layout;
use crate::memory::AbstractState;
use crate::platform::ByteOrder;
use crate::value::Value;

#[derive(Clone)]
pub struct Instance {
    cache: Arc<LayoutCache>,
    layout: Arc<Layout>,
    state: Arc<dyn AbstractState>,
    address: u64,
    order: ByteOrder,
}

impl Instance {
    /// Bind `layout` at `address`
    ///
    /// Fails with [`Error::ConfigMismatch`] when the layout was computed for a
    /// different platform than the one `state` reports.
    pub fn bind(
        cache: Arc<LayoutCache>,
        layout: Arc<Layout>,
        state: Arc<dyn AbstractState>,
        address: u64,
        order: ByteOrder,
    ) -> Result<Self> {
        let state_config = state.config();
        if layout.config() != state_config {
            return Err(Error::ConfigMismatch {
                layout: layout.config(),
                state: state_config,
            });
        }

        Ok(Self {
            cache,
            layout,
            state,
            address,
            order,
        })
    }

    /// Reconstruct `declaration` for `state` and bind it in the state's byte order
    pub fn of(
        cache: &Arc<LayoutCache>,
        declaration: &Arc<Declaration>,
        state: Arc<dyn AbstractState>,
        address: u64,
    ) -> Result<Self> {
        let layout = cache.reconstruct_for(declaration, state.as_ref())?;
        let order = state.config().byte_order();
        Self::bind(Arc::clone(cache), layout, state, address, order)
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    pub fn state(&self) -> &Arc<dyn AbstractState> {
        &self.state
    }

    pub fn cache(&self) -> &Arc<LayoutCache> {
        &self.cache
    }

    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Same layout and state, different address
    pub fn at(&self, address: u64) -> Self {
        Self {
            address,
            ..self.clone()
        }
    }

    pub fn field_address(&self, name: &str) -> Result<u64> {
        self.layout.accessor(name)?.address(self)
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.layout.accessor(name)?.get(self)
    }

    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.layout.accessor(name)?.set(self, value)
    }

    /// Read the vtable pointer of a virtual struct
    pub fn vtable(&self) -> Result<u64> {
        if !self.layout.has_vtable() {
            return Err(Error::UnknownField {
                type_name: self.layout.name().to_string(),
                field: "<vtable>".to_string(),
            });
        }
        let slot = Data::pointer(Data::opaque("vtable"));
        let value = slot.read(&self.cache, &self.state, self.address, self.order)?;
        Ok(value.as_address().unwrap_or_default())
    }

    /// Read a pointer field and then the value it points at
    pub fn follow(&self, name: &str) -> Result<Value> {
        let field = self.layout.accessor(name)?;
        let Data::Pointer(pointee) = field.data() else {
            return Err(Error::ValueMismatch {
                expected: "pointer field".to_string(),
                actual: field.data().to_string(),
            });
        };

        let target = field.get(self)?.as_address().unwrap_or_default();
        if target == 0 {
            return Err(Error::NullPointer {
                address: field.address(self)?,
            });
        }
        pointee.read(&self.cache, &self.state, target, self.order)
    }

    /// Read one element of an array field without reading the rest
    pub fn element(&self, name: &str, index: usize) -> Result<Value> {
        let (element, address) = self.element_slot(name, index)?;
        element.read(&self.cache, &self.state, address, self.order)
    }

    /// Write one element of an array field
    pub fn set_element(&self, name: &str, index: usize, value: impl Into<Value>) -> Result<()> {
        let (element, address) = self.element_slot(name, index)?;
        element.write(&self.cache, &self.state, address, &value.into(), self.order)
    }

    fn element_slot(&self, name: &str, index: usize) -> Result<(&Data, u64)> {
        let field = self.layout.accessor(name)?;
        let Data::Array { element, count } = field.data() else {
            return Err(Error::ValueMismatch {
                expected: "array field".to_string(),
                actual: field.data().to_string(),
            });
        };
        if index >= *count {
            return Err(Error::ValueMismatch {
                expected: format!("index below {}", count),
                actual: index.to_string(),
            });
        }

        let stride = element.size(&self.cache, self.layout.config())?;
        let address = offset_address(field.address(self)?, stride * index)?;
        Ok((element, address))
    }

    /// Read every field, recursing into nested composites
    ///
    /// Pointers are rendered as hex strings and never followed.
    pub fn snapshot(&self) -> Result<Json> {
        let mut map = Map::new();
        if self.layout.has_vtable() {
            map.insert("<vtable>".to_string(), hex(self.vtable()?));
        }
        for field in self.layout.fields() {
            map.insert(field.name().to_string(), to_json(field.get(self)?)?);
        }
        Ok(Json::Object(map))
    }
}

fn hex(address: u64) -> Json {
    Json::String(format!("{:#x}", address))
}

fn to_json(value: Value) -> Result<Json> {
    Ok(match value {
        Value::Signed(v) => Json::from(v),
        Value::Unsigned(v) => Json::from(v),
        Value::Float(v) => Number::from_f64(v).map_or(Json::Null, Json::Number),
        Value::Bool(v) => Json::Bool(v),
        Value::Pointer(address) => hex(address),
        Value::Bytes(bytes) => Json::from(bytes),
        Value::Array(values) => Json::Array(
            values
                .into_iter()
                .map(to_json)
                .collect::<Result<Vec<_>>>()?,
        ),
        Value::Instance(instance) => instance.snapshot()?,
    })
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("type", &self.layout.name())
            .field("config", &self.layout.config())
            .field("address", &format_args!("{:#x}", self.address))
            .field("order", &self.order)
            .finish()
    }
}
