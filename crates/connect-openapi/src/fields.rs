use crate::{
    collector::TypeDescriptor,
    converter::ConversionState,
    descriptor::{FieldDescriptor, FieldKind, MessageDescriptor},
    error::{ConvertError, ConvertResult},
    protocol::{self, GOOGLE_ANY_ID},
    specification::{AdditionalProperties, Schema, SchemaType},
    synthesizer,
};

/// Map one field to its property schema.
///
/// Scalars are mapped inline. Message and enum fields become references to
/// named components, synthesizing the target first if it has not been
/// produced yet.
pub(crate) fn field_schema(
    state: &mut ConversionState<'_>,
    owner: &str,
    field: &FieldDescriptor,
) -> ConvertResult<Schema> {
    let mut schema = if field.is_repeated() {
        match map_entry(state, field) {
            Some(entry) => map_schema(state, owner, field, entry)?,
            None => Schema::array(element_schema(state, owner, field)?),
        }
    } else {
        element_schema(state, owner, field)?
    };

    if let Some(description) = &field.description {
        schema.description = Some(description.clone());
    }
    Ok(schema)
}

/// The map-entry message behind a `map<K, V>` field
fn map_entry<'a>(
    state: &ConversionState<'a>,
    field: &FieldDescriptor,
) -> Option<&'a MessageDescriptor> {
    match &field.kind {
        FieldKind::Message(name) => match state.registry.get(name) {
            Some(TypeDescriptor::Message(entry)) if entry.is_map_entry => Some(entry),
            _ => None,
        },
        _ => None,
    }
}

/// Maps are string-keyed objects whatever the declared key kind
fn map_schema(
    state: &mut ConversionState<'_>,
    owner: &str,
    field: &FieldDescriptor,
    entry: &MessageDescriptor,
) -> ConvertResult<Schema> {
    let value = entry
        .fields
        .iter()
        .find(|f| f.number == 2)
        .ok_or_else(|| {
            ConvertError::unsupported_field(owner, &field.name, "map entry without value")
        })?;
    Ok(Schema::map(element_schema(state, &entry.full_name, value)?))
}

/// Schema of a single value of the field, ignoring its label
fn element_schema(
    state: &mut ConversionState<'_>,
    owner: &str,
    field: &FieldDescriptor,
) -> ConvertResult<Schema> {
    if let Some(schema) = scalar_schema(&field.kind) {
        return Ok(schema);
    }

    match &field.kind {
        FieldKind::Message(name) | FieldKind::Enum(name) => {
            if let Some(schema) = well_known_schema(name) {
                return Ok(schema);
            }
            if name == GOOGLE_ANY_ID {
                protocol::register_google_any(&mut state.components)?;
                return Ok(Schema::reference(GOOGLE_ANY_ID));
            }
            synthesizer::synthesize(state, name, &format!("{}.{}", owner, field.name))?;
            Ok(Schema::reference(name))
        }
        other => Err(ConvertError::unsupported_field(
            owner,
            &field.name,
            format!("{:?}", other),
        )),
    }
}

/// Inline schema for a scalar kind, `None` for message and enum kinds
pub fn scalar_schema(kind: &FieldKind) -> Option<Schema> {
    let schema = match kind {
        FieldKind::Double => Schema::scalar("number", Some("double")),
        FieldKind::Float => Schema::scalar("number", Some("float")),
        FieldKind::Int32 | FieldKind::SInt32 | FieldKind::SFixed32 => {
            Schema::scalar("integer", Some("int32"))
        }
        FieldKind::UInt32 | FieldKind::Fixed32 => Schema {
            minimum: Some(0.0),
            ..Schema::scalar("integer", Some("int32"))
        },
        // The JSON mapping writes 64-bit integers as strings
        FieldKind::Int64 | FieldKind::SInt64 | FieldKind::SFixed64 => int64_schema(),
        FieldKind::UInt64 | FieldKind::Fixed64 => Schema {
            minimum: Some(0.0),
            ..int64_schema()
        },
        FieldKind::Bool => Schema::typed("boolean"),
        FieldKind::String => Schema::typed("string"),
        FieldKind::Bytes => Schema {
            content_encoding: Some("base64".to_string()),
            ..Schema::scalar("string", Some("byte"))
        },
        FieldKind::Message(_) | FieldKind::Enum(_) => return None,
    };
    Some(schema)
}

fn int64_schema() -> Schema {
    Schema {
        schema_type: Some(SchemaType::Multiple(vec![
            "integer".to_string(),
            "string".to_string(),
        ])),
        format: Some("int64".to_string()),
        ..Default::default()
    }
}

/// Inline schemas for well-known types that have a dedicated JSON mapping
pub fn well_known_schema(name: &str) -> Option<Schema> {
    let wrapped = |kind: FieldKind| {
        scalar_schema(&kind).map(|schema| Schema {
            nullable: Some(true),
            ..schema
        })
    };

    match name {
        "google.protobuf.Timestamp" => Some(Schema::scalar("string", Some("date-time"))),
        "google.protobuf.Duration" => Some(Schema {
            pattern: Some(r"^-?[0-9]+(\.[0-9]+)?s$".to_string()),
            ..Schema::typed("string")
        }),
        "google.protobuf.Empty" => Some(Schema::object()),
        "google.protobuf.Struct" => Some(Schema {
            additional_properties: Some(AdditionalProperties::Allowed(true)),
            ..Schema::object()
        }),
        "google.protobuf.Value" => Some(Schema::default()),
        "google.protobuf.ListValue" => Some(Schema::array(Schema::default())),
        "google.protobuf.NullValue" => Some(Schema::typed("null")),
        "google.protobuf.FieldMask" => Some(Schema::typed("string")),
        "google.protobuf.DoubleValue" => wrapped(FieldKind::Double),
        "google.protobuf.FloatValue" => wrapped(FieldKind::Float),
        "google.protobuf.Int64Value" => wrapped(FieldKind::Int64),
        "google.protobuf.UInt64Value" => wrapped(FieldKind::UInt64),
        "google.protobuf.Int32Value" => wrapped(FieldKind::Int32),
        "google.protobuf.UInt32Value" => wrapped(FieldKind::UInt32),
        "google.protobuf.BoolValue" => wrapped(FieldKind::Bool),
        "google.protobuf.StringValue" => wrapped(FieldKind::String),
        "google.protobuf.BytesValue" => wrapped(FieldKind::Bytes),
        _ => None,
    }
}

/// Types the collector never registers: inline well-known types and `google.protobuf.Any`
pub fn is_well_known_type(name: &str) -> bool {
    name == GOOGLE_ANY_ID || well_known_schema(name).is_some()
}
