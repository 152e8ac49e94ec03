//! Descriptor builders shared by the unit tests.

pub use crate::descriptor::FieldKind;
use crate::descriptor::{
    json_name, EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FieldLabel, FileDescriptor,
    IdempotencyLevel, MessageDescriptor, MethodDescriptor, ServiceDescriptor,
};

/// Last dotted segment of a fully qualified name
fn simple_name(full_name: &str) -> String {
    full_name.rsplit('.').next().unwrap_or(full_name).to_string()
}

pub fn file(name: &str, package: &str) -> FileDescriptor {
    FileDescriptor {
        name: name.to_string(),
        package: package.to_string(),
        ..Default::default()
    }
}

pub fn message(full_name: &str) -> MessageDescriptor {
    MessageDescriptor {
        name: simple_name(full_name),
        full_name: full_name.to_string(),
        ..Default::default()
    }
}

/// Synthetic `map<K, V>` entry message
pub fn map_entry_message(full_name: &str, key: FieldKind, value: FieldKind) -> MessageDescriptor {
    MessageDescriptor {
        is_map_entry: true,
        ..message(full_name)
            .with_field(FieldDescriptor {
                number: 1,
                ..scalar("key", key)
            })
            .with_field(FieldDescriptor {
                number: 2,
                ..scalar("value", value)
            })
    }
}

pub fn enumeration(full_name: &str, values: &[&str]) -> EnumDescriptor {
    EnumDescriptor {
        name: simple_name(full_name),
        full_name: full_name.to_string(),
        values: values
            .iter()
            .enumerate()
            .map(|(i, v)| EnumValueDescriptor {
                name: v.to_string(),
                number: i as i32,
                description: None,
            })
            .collect(),
        description: None,
    }
}

pub fn scalar(name: &str, kind: FieldKind) -> FieldDescriptor {
    FieldDescriptor {
        name: name.to_string(),
        json_name: json_name(name),
        number: 0,
        kind,
        label: FieldLabel::Optional,
        oneof_index: None,
        proto3_optional: false,
        description: None,
    }
}

pub fn message_field(name: &str, target: &str) -> FieldDescriptor {
    scalar(name, FieldKind::Message(target.to_string()))
}

pub fn enum_field(name: &str, target: &str) -> FieldDescriptor {
    scalar(name, FieldKind::Enum(target.to_string()))
}

pub fn repeated(field: FieldDescriptor) -> FieldDescriptor {
    FieldDescriptor {
        label: FieldLabel::Repeated,
        ..field
    }
}

pub fn service(name: &str, methods: Vec<MethodDescriptor>) -> ServiceDescriptor {
    ServiceDescriptor {
        name: simple_name(name),
        full_name: name.to_string(),
        methods,
        description: None,
    }
}

pub fn method(name: &str, input: &str, output: &str) -> MethodDescriptor {
    MethodDescriptor {
        name: name.to_string(),
        input_type: input.to_string(),
        output_type: output.to_string(),
        ..Default::default()
    }
}

/// A unary method marked `NO_SIDE_EFFECTS`
pub fn get_method(name: &str, input: &str, output: &str) -> MethodDescriptor {
    MethodDescriptor {
        idempotency_level: IdempotencyLevel::NoSideEffects,
        ..method(name, input, output)
    }
}

impl FileDescriptor {
    pub fn with_message(mut self, message: MessageDescriptor) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_enum(mut self, en: EnumDescriptor) -> Self {
        self.enums.push(en);
        self
    }

    pub fn with_service(mut self, service: ServiceDescriptor) -> Self {
        self.services.push(service);
        self
    }
}

impl MessageDescriptor {
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_nested_message(mut self, message: MessageDescriptor) -> Self {
        self.nested_messages.push(message);
        self
    }

    pub fn with_nested_enum(mut self, en: EnumDescriptor) -> Self {
        self.nested_enums.push(en);
        self
    }
}
