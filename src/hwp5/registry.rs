//! Tag and extension lookup tables.

use super::models::ModelType;
use crate::error::{Error, Result};
use crate::model::Chid;
use log::warn;
use std::collections::HashMap;
use std::fmt;
use std::sync::OnceLock;

/// Context that selects a refinement of a base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionKey {
    /// The control id read from the record itself.
    Chid(Chid),
    /// The parent's type, and whether the parent has seen its table body.
    Parent {
        parent: ModelType,
        seen_table_body: bool,
    },
}

impl fmt::Display for ExtensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionKey::Chid(chid) => write!(f, "chid '{}'", chid),
            ExtensionKey::Parent {
                parent,
                seen_table_body,
            } => write!(f, "parent {} (table body seen: {})", parent, seen_table_body),
        }
    }
}

/// How a base type derives its extension key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionRule {
    /// Read a CHID field of the decoded base content.
    ByChid(&'static str),
    /// Use the parent model's type and context.
    ByParent,
}

/// Maps tags to base types and extension keys to refinements.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    by_tag: HashMap<u16, ModelType>,
    extensions: HashMap<(ModelType, ExtensionKey), ModelType>,
    conflicts: HashMap<(ModelType, ExtensionKey), Vec<ModelType>>,
}

impl TypeRegistry {
    /// Builds a registry holding every type in [`ModelType::ALL`].
    pub fn new() -> Self {
        let mut registry = Self::default();
        for &ty in ModelType::ALL {
            registry.register(ty);
        }
        registry
    }

    /// Registers a type under its tag and, for refinements, its extension key.
    pub fn register(&mut self, ty: ModelType) {
        if let Some(tag) = ty.tag() {
            let tag = tag as u16;
            if let Some(existing) = self.by_tag.get(&tag) {
                warn!("tag {} already bound to {}, ignoring {}", tag, existing, ty);
            } else {
                self.by_tag.insert(tag, ty);
            }
        }
        if let Some(key) = ty.extension_key() {
            self.register_extension(ty.base(), key, ty);
        }
    }

    /// Registers `ty` as the refinement of `base` for `key`.
    ///
    /// A second, different type for the same key makes the key ambiguous.
    pub fn register_extension(&mut self, base: ModelType, key: ExtensionKey, ty: ModelType) {
        let slot = (base, key);
        match self.extensions.get(&slot) {
            Some(&existing) if existing == ty => {}
            Some(&existing) => {
                warn!("{} and {} both extend {} for {}", existing, ty, base, key);
                self.conflicts
                    .entry(slot)
                    .or_insert_with(|| vec![existing])
                    .push(ty);
            }
            None => {
                self.extensions.insert(slot, ty);
            }
        }
    }

    /// Base type bound to a raw tag id.
    pub fn base_for_tag(&self, tag_id: u16) -> Option<ModelType> {
        self.by_tag.get(&tag_id).copied()
    }

    /// Refinement of `base` selected by `key`, if any.
    pub fn lookup(&self, base: ModelType, key: ExtensionKey) -> Result<Option<ModelType>> {
        let slot = (base, key);
        if self.conflicts.contains_key(&slot) {
            return Err(Error::AmbiguousExtension {
                base: base.name(),
                key: key.to_string(),
            });
        }
        Ok(self.extensions.get(&slot).copied())
    }

    /// Refinement of `base` for a parent, trying the parent's supertypes
    /// when the exact parent type has no entry.
    pub fn lookup_by_parent(
        &self,
        base: ModelType,
        parent: ModelType,
        seen_table_body: bool,
    ) -> Result<Option<ModelType>> {
        let mut current = Some(parent);
        while let Some(ty) = current {
            let key = ExtensionKey::Parent {
                parent: ty,
                seen_table_body,
            };
            if let Some(found) = self.lookup(base, key)? {
                return Ok(Some(found));
            }
            current = ty.supertype();
        }
        Ok(None)
    }
}

/// The process-wide registry.
pub fn registry() -> &'static TypeRegistry {
    static REGISTRY: OnceLock<TypeRegistry> = OnceLock::new();
    REGISTRY.get_or_init(TypeRegistry::new)
}
