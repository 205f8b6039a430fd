//! TOML declaration files
//!
//! A schema lists composite types in dependency order:
//!
//! ```toml
//! [[types]]
//! name = "Vec2"
//! fields = [
//!     { name = "x", type = "f32" },
//!     { name = "y", type = "f32" },
//! ]
//!
//! [[types]]
//! name = "Node"
//! virtual = true
//! fields = [
//!     { name = "pos", type = "Vec2" },
//!     { name = "children", type = "*Node[4]" },
//!     { name = "reserved", type = "pad[4]" },
//! ]
//! ```
//!
//! Type expressions are a primitive (`u8`..`u64`, `i8`..`i64`, `f32`, `f64`,
//! `bool`, `usize`, `isize`), a previously declared type, `*T` for a pointer,
//! `T[N]` for an array, or `pad[N]` for filler bytes. A name that is not
//! declared yet becomes an opaque type, which is fine behind a pointer and a
//! definition error anywhere else.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::data::Data;
use crate::decl::Declaration;
use crate::error::{Error, Result};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KindName {
    #[default]
    Struct,
    Union,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FieldEntry {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TypeEntry {
    name: String,
    #[serde(default)]
    kind: KindName,
    #[serde(default)]
    packed: bool,
    #[serde(default, rename = "virtual")]
    virtual_table: bool,
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

#[derive(Debug, Deserialize)]
struct SchemaFile {
    #[serde(default)]
    types: Vec<TypeEntry>,
}

/// Ordered registry of declarations loaded from a schema
#[derive(Debug, Default)]
pub struct Schema {
    types: Vec<Arc<Declaration>>,
    by_name: HashMap<String, usize>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a schema from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let schema = Self::from_toml_str(&content)?;
        debug!("Loaded {} types from {}", schema.len(), path.display());
        Ok(schema)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(content)?;
        let mut schema = Self::new();

        for entry in file.types {
            let mut builder = match entry.kind {
                KindName::Struct => Declaration::structure(&entry.name),
                KindName::Union => Declaration::union(&entry.name),
            }
            .packed(entry.packed)
            .virtual_table(entry.virtual_table);

            for field in &entry.fields {
                let data = schema.parse_type(&field.ty).map_err(|err| {
                    Error::Schema(format!("{}.{}: {}", entry.name, field.name, err))
                })?;
                builder = builder.field(&field.name, data);
            }

            schema.insert(builder.build()?)?;
        }

        Ok(schema)
    }

    /// Register a declaration; names must be unique
    pub fn insert(&mut self, declaration: Arc<Declaration>) -> Result<()> {
        let name = declaration.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(Error::Schema(format!("type `{}` declared twice", name)));
        }
        self.by_name.insert(name, self.types.len());
        self.types.push(declaration);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Declaration>> {
        self.by_name.get(name).map(|&i| &self.types[i])
    }

    /// Like [`get`](Self::get), failing with a schema error
    pub fn require(&self, name: &str) -> Result<&Arc<Declaration>> {
        self.get(name)
            .ok_or_else(|| Error::Schema(format!("unknown type `{}`", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Declaration>> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Parse a type expression against the types declared so far
    pub fn parse_type(&self, expr: &str) -> Result<Data> {
        let expr = expr.trim();

        if let Some(head) = expr.strip_suffix(']') {
            let open = head
                .rfind('[')
                .ok_or_else(|| invalid(expr, "unbalanced brackets"))?;
            let count: usize = head[open + 1..]
                .trim()
                .parse()
                .map_err(|_| invalid(expr, "array length is not a number"))?;
            let element = head[..open].trim();

            return if element == "pad" {
                Ok(Data::Padding(count))
            } else {
                Ok(Data::array(self.parse_type(element)?, count))
            };
        }

        if let Some(pointee) = expr.strip_prefix('*') {
            return Ok(Data::pointer(self.parse_type(pointee)?));
        }

        let data = match expr {
            "u8" => Data::U8,
            "u16" => Data::U16,
            "u32" => Data::U32,
            "u64" => Data::U64,
            "i8" => Data::I8,
            "i16" => Data::I16,
            "i32" => Data::I32,
            "i64" => Data::I64,
            "f32" => Data::F32,
            "f64" => Data::F64,
            "bool" => Data::BOOL,
            "usize" => Data::USIZE,
            "isize" => Data::ISIZE,
            name if is_identifier(name) => match self.get(name) {
                Some(declaration) => Data::composite(declaration),
                None => Data::opaque(name),
            },
            _ => return Err(invalid(expr, "not a type")),
        };
        Ok(data)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn invalid(expr: &str, reason: &str) -> Error {
    Error::Schema(format!("invalid type expression `{}`: {}", expr, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::LayoutCache;
    use crate::platform::Preset;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
        [[types]]
        name = "Vec2"
        fields = [
            { name = "x", type = "f32" },
            { name = "y", type = "f32" },
        ]

        [[types]]
        name = "Node"
        virtual = true
        fields = [
            { name = "pos", type = "Vec2" },
            { name = "children", type = "*Node[4]" },
            { name = "reserved", type = "pad[4]" },
        ]

        [[types]]
        name = "Either"
        kind = "union"
        fields = [
            { name = "node", type = "*Node" },
            { name = "raw", type = "u64" },
        ]
    "#;

    #[test]
    fn test_parse_sample() {
        let schema = Schema::from_toml_str(SAMPLE).unwrap();
        assert_eq!(schema.len(), 3);
        assert!(schema.require("Either").unwrap().is_union());

        let cache = LayoutCache::new();
        let node = cache
            .reconstruct(schema.require("Node").unwrap(), Preset::Win32.config())
            .unwrap();
        let offsets: Vec<_> = node.fields().iter().map(|f| f.offset()).collect();
        assert_eq!(offsets, [4, 12, 28]);
        assert_eq!(node.size(), 32);
    }

    #[test]
    fn test_type_expressions() {
        let schema = Schema::from_toml_str(SAMPLE).unwrap();
        for expr in ["u8", "*Vec2", "Vec2[2]", "*Node[4]", "**u8", "pad[3]", "Unknown"] {
            assert_eq!(schema.parse_type(expr).unwrap().to_string(), expr);
        }
        assert!(matches!(
            schema.parse_type("Vec2").unwrap(),
            Data::Composite(_)
        ));
        assert!(matches!(
            schema.parse_type("Later").unwrap(),
            Data::Opaque(_)
        ));
    }

    #[test]
    fn test_invalid_expressions() {
        let schema = Schema::new();
        for expr in ["u8[", "u8]", "u8[x]", "1abc", ""] {
            assert!(schema.parse_type(expr).is_err(), "{expr}");
        }
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let content = r#"
            [[types]]
            name = "A"
            [[types]]
            name = "A"
        "#;
        assert!(matches!(
            Schema::from_toml_str(content),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn test_bad_field_reports_location() {
        let content = r#"
            [[types]]
            name = "A"
            fields = [{ name = "x", type = "u8[[" }]
        "#;
        let err = Schema::from_toml_str(content).unwrap_err();
        assert!(err.to_string().contains("A.x"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let schema = Schema::load(file.path()).unwrap();
        let names: Vec<_> = schema.iter().map(|d| d.name().to_string()).collect();
        assert_eq!(names, ["Vec2", "Node", "Either"]);
    }
}
