/*!
Type collection.

Walks a root file of a [`DescriptorSet`] and registers every message and
enum reachable from it: declared types (including nested ones), method
request/response types and types referenced from fields, following imports
across the whole set. Each fully qualified name is visited once.
*/

use crate::{
    descriptor::{DescriptorSet, EnumDescriptor, FileDescriptor, MessageDescriptor},
    error::{ConvertError, ConvertResult},
    fields::is_well_known_type,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::debug;

/// A message or enum found while collecting
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TypeDescriptor<'a> {
    Message(&'a MessageDescriptor),
    Enum(&'a EnumDescriptor),
}

impl<'a> TypeDescriptor<'a> {
    pub fn full_name(&self) -> &'a str {
        match *self {
            TypeDescriptor::Message(m) => &m.full_name,
            TypeDescriptor::Enum(e) => &e.full_name,
        }
    }

    /// Map-entry messages are inlined into their map field and never become components
    pub fn is_map_entry(&self) -> bool {
        matches!(self, TypeDescriptor::Message(m) if m.is_map_entry)
    }
}

/// Registry of collected types, in discovery order
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry<'a> {
    types: IndexMap<String, TypeDescriptor<'a>>,
}

impl<'a> TypeRegistry<'a> {
    pub fn get(&self, name: &str) -> Option<TypeDescriptor<'a>> {
        self.types.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Types in discovery order
    pub fn iter(&self) -> impl Iterator<Item = (&str, TypeDescriptor<'a>)> + '_ {
        self.types.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn message_count(&self) -> usize {
        self.types
            .values()
            .filter(|t| matches!(t, TypeDescriptor::Message(_)))
            .count()
    }

    pub fn enum_count(&self) -> usize {
        self.types
            .values()
            .filter(|t| matches!(t, TypeDescriptor::Enum(_)))
            .count()
    }
}

/// Collects the types reachable from one file
pub struct TypeCollector<'a> {
    /// Every type declared anywhere in the set
    index: HashMap<&'a str, TypeDescriptor<'a>>,
    registry: TypeRegistry<'a>,
}

impl<'a> TypeCollector<'a> {
    /// Index every type in the set.
    ///
    /// Fails with [`ConvertError::NameCollision`] when one fully qualified
    /// name is declared twice with different definitions. Identical
    /// duplicates (the same file listed twice) are accepted.
    pub fn new(set: &'a DescriptorSet) -> ConvertResult<Self> {
        let mut index = HashMap::new();
        for file in &set.files {
            for message in &file.messages {
                index_message(&mut index, message)?;
            }
            for en in &file.enums {
                index_type(&mut index, TypeDescriptor::Enum(en))?;
            }
        }
        Ok(Self {
            index,
            registry: TypeRegistry::default(),
        })
    }

    /// Collect everything reachable from `file`
    pub fn collect_file(mut self, file: &'a FileDescriptor) -> ConvertResult<TypeRegistry<'a>> {
        for message in &file.messages {
            self.visit_message(message)?;
        }
        for en in &file.enums {
            self.visit(TypeDescriptor::Enum(en));
        }
        for service in &file.services {
            for method in &service.methods {
                let referenced_from = format!("{}.{}", service.full_name, method.name);
                self.visit_name(&method.input_type, &referenced_from)?;
                self.visit_name(&method.output_type, &referenced_from)?;
            }
        }

        debug!(
            file = %file.name,
            messages = self.registry.message_count(),
            enums = self.registry.enum_count(),
            "collection complete"
        );
        Ok(self.registry)
    }

    /// Register a type; returns `false` if it was already registered
    fn visit(&mut self, ty: TypeDescriptor<'a>) -> bool {
        let name = ty.full_name();
        if self.registry.types.contains_key(name) {
            return false;
        }
        self.registry.types.insert(name.to_string(), ty);
        true
    }

    fn visit_message(&mut self, message: &'a MessageDescriptor) -> ConvertResult<()> {
        if !self.visit(TypeDescriptor::Message(message)) {
            return Ok(());
        }
        for nested in &message.nested_messages {
            self.visit_message(nested)?;
        }
        for en in &message.nested_enums {
            self.visit(TypeDescriptor::Enum(en));
        }
        for field in &message.fields {
            if let Some(target) = field.kind.type_name() {
                let referenced_from = format!("{}.{}", message.full_name, field.name);
                self.visit_name(target, &referenced_from)?;
            }
        }
        Ok(())
    }

    fn visit_name(&mut self, name: &str, referenced_from: &str) -> ConvertResult<()> {
        if is_well_known_type(name) || self.registry.contains(name) {
            return Ok(());
        }
        match self.index.get(name).copied() {
            Some(TypeDescriptor::Message(message)) => self.visit_message(message),
            Some(ty @ TypeDescriptor::Enum(_)) => {
                self.visit(ty);
                Ok(())
            }
            None => Err(ConvertError::unresolvable(name, referenced_from)),
        }
    }
}

fn index_type<'a>(
    index: &mut HashMap<&'a str, TypeDescriptor<'a>>,
    ty: TypeDescriptor<'a>,
) -> ConvertResult<()> {
    match index.get(ty.full_name()) {
        Some(existing) if *existing == ty => Ok(()),
        Some(_) => Err(ConvertError::name_collision(ty.full_name())),
        None => {
            index.insert(ty.full_name(), ty);
            Ok(())
        }
    }
}

fn index_message<'a>(
    index: &mut HashMap<&'a str, TypeDescriptor<'a>>,
    message: &'a MessageDescriptor,
) -> ConvertResult<()> {
    index_type(index, TypeDescriptor::Message(message))?;
    for nested in &message.nested_messages {
        index_message(index, nested)?;
    }
    for en in &message.nested_enums {
        index_type(index, TypeDescriptor::Enum(en))?;
    }
    Ok(())
}

/// Collect the types reachable from `file` within `set`
pub fn collect_file<'a>(
    set: &'a DescriptorSet,
    file: &'a FileDescriptor,
) -> ConvertResult<TypeRegistry<'a>> {
    TypeCollector::new(set)?.collect_file(file)
}
