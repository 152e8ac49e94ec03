use crate::{
    collector::TypeDescriptor,
    converter::ConversionState,
    descriptor::{EnumDescriptor, FieldLabel, MessageDescriptor},
    error::{ConvertError, ConvertResult},
    fields::field_schema,
    protocol,
    specification::{AdditionalProperties, Schema},
};
use tracing::trace;

/// Produce the component for `name` unless it has already been produced or
/// is in progress further up the stack.
///
/// The name is marked visited and its slot reserved before any field is
/// mapped, so a reference back to a type that is still being built resolves
/// by name and recursion stops there.
pub(crate) fn synthesize(
    state: &mut ConversionState<'_>,
    name: &str,
    referenced_from: &str,
) -> ConvertResult<()> {
    if state.visited.contains(name) {
        return Ok(());
    }
    if state.config.override_connect_error_detail && protocol::is_error_detail(name) {
        // The fixed library entry stands in for the collected message
        state.visited.insert(name.to_string());
        trace!(component = name, "using fixed error detail schema");
        return protocol::register_error_detail_schemas(&mut state.components);
    }
    let ty = state
        .registry
        .get(name)
        .ok_or_else(|| ConvertError::unresolvable(name, referenced_from))?;

    state.visited.insert(name.to_string());
    if !state.components.reserve(name) {
        // Taken by something other than this type, e.g. a protocol schema
        return Err(ConvertError::name_collision(name));
    }

    let schema = match ty {
        TypeDescriptor::Message(message) => message_schema(state, message)?,
        TypeDescriptor::Enum(en) => enum_schema(en),
    };
    trace!(component = name, "synthesized component");
    state.components.complete(name, schema);
    Ok(())
}

fn message_schema(
    state: &mut ConversionState<'_>,
    message: &MessageDescriptor,
) -> ConvertResult<Schema> {
    let mut schema = Schema {
        additional_properties: Some(AdditionalProperties::Allowed(false)),
        ..Schema::object().with_title(&message.name)
    };
    schema.description = message.description.clone();

    for field in &message.fields {
        let property = field_schema(state, &message.full_name, field)?;
        let key = if state.config.use_json_names {
            field.json_name.clone()
        } else {
            field.name.clone()
        };
        if field.label == FieldLabel::Required {
            schema.required.push(key.clone());
        }
        schema.properties.insert(key, property);
    }
    Ok(schema)
}

fn enum_schema(en: &EnumDescriptor) -> Schema {
    let mut schema =
        Schema::string_enum(en.values.iter().map(|v| v.name.clone())).with_title(&en.name);
    schema.description = en.description.clone();
    schema
}

#[cfg(test)]
mod tests {
    use crate::config::ConverterConfig;
    use crate::converter::convert_file;
    use crate::descriptor::{DescriptorSet, FieldKind, FieldLabel};
    use crate::error::ConvertError;
    use crate::specification::{AdditionalProperties, Schema};
    use crate::test_utils::*;

    #[test]
    fn test_message_becomes_closed_object_in_field_order() {
        let set = DescriptorSet::from_files(vec![file("u.proto", "").with_message(
            message("User")
                .with_field(scalar("id", FieldKind::String))
                .with_field(scalar("name", FieldKind::String))
                .with_field(scalar("email", FieldKind::String)),
        )]);
        let components = convert_file(&set, "u.proto", &ConverterConfig::default()).unwrap();

        let user = components.get("User").unwrap();
        assert_eq!(user.title.as_deref(), Some("User"));
        assert_eq!(user.additional_properties, Some(AdditionalProperties::Allowed(false)));
        let keys: Vec<_> = user.properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "name", "email"]);
    }

    #[test]
    fn test_enum_values_in_declaration_order() {
        let set = DescriptorSet::from_files(vec![file("e.proto", "acme").with_enum(
            enumeration("acme.Level", &["LEVEL_UNSPECIFIED", "LEVEL_HIGH", "LEVEL_LOW"]),
        )]);
        let components = convert_file(&set, "e.proto", &ConverterConfig::default()).unwrap();

        assert_eq!(
            components.get("acme.Level"),
            Some(
                &Schema::string_enum(["LEVEL_UNSPECIFIED", "LEVEL_HIGH", "LEVEL_LOW"])
                    .with_title("Level")
            )
        );
    }

    #[test]
    fn test_shared_type_is_registered_once() {
        let set = DescriptorSet::from_files(vec![file("s.proto", "")
            .with_message(message("Address"))
            .with_message(
                message("Person")
                    .with_field(message_field("home", "Address"))
                    .with_field(message_field("work", "Address")),
            )
            .with_message(message("Company").with_field(message_field("hq", "Address")))]);
        let components = convert_file(&set, "s.proto", &ConverterConfig::default()).unwrap();

        assert_eq!(components.names().filter(|n| *n == "Address").count(), 1);
        let person = components.get("Person").unwrap();
        assert_eq!(person.properties["home"].ref_target(), Some("Address"));
        assert_eq!(person.properties["work"].ref_target(), Some("Address"));
        assert_eq!(
            components.get("Company").unwrap().properties["hq"].ref_target(),
            Some("Address")
        );
    }

    #[test]
    fn test_self_reference_terminates_with_ref_cycle() {
        let set = DescriptorSet::from_files(vec![file("t.proto", "").with_message(
            message("Node")
                .with_field(scalar("value", FieldKind::String))
                .with_field(repeated(message_field("children", "Node")))
                .with_field(message_field("parent", "Node")),
        )]);
        let components = convert_file(&set, "t.proto", &ConverterConfig::default()).unwrap();

        let node = components.get("Node").unwrap();
        assert_eq!(node.properties["parent"].ref_target(), Some("Node"));
        assert_eq!(
            node.properties["children"].items.as_ref().unwrap().ref_target(),
            Some("Node")
        );
        assert!(components.dangling_references().is_empty());
    }

    #[test]
    fn test_mutual_recursion_terminates() {
        let set = DescriptorSet::from_files(vec![file("m.proto", "")
            .with_message(message("A").with_field(message_field("b", "B")))
            .with_message(message("B").with_field(message_field("c", "C")))
            .with_message(message("C").with_field(message_field("a", "A")))]);
        let components = convert_file(&set, "m.proto", &ConverterConfig::default()).unwrap();

        assert_eq!(components.get("A").unwrap().properties["b"].ref_target(), Some("B"));
        assert_eq!(components.get("B").unwrap().properties["c"].ref_target(), Some("C"));
        assert_eq!(components.get("C").unwrap().properties["a"].ref_target(), Some("A"));
        let names: Vec<_> = components.names().collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_required_and_proto_names() {
        let mut id = scalar("user_id", FieldKind::String);
        id.label = FieldLabel::Required;
        let set = DescriptorSet::from_files(vec![file("p.proto", "").with_message(
            message("Legacy")
                .with_field(id)
                .with_field(scalar("display_name", FieldKind::String)),
        )]);

        let camel = convert_file(&set, "p.proto", &ConverterConfig::default()).unwrap();
        let legacy = camel.get("Legacy").unwrap();
        assert!(legacy.properties.contains_key("userId"));
        assert_eq!(legacy.required, vec!["userId".to_string()]);

        let config = ConverterConfig::from_parameter("proto-names").unwrap();
        let snake = convert_file(&set, "p.proto", &config).unwrap();
        let legacy = snake.get("Legacy").unwrap();
        assert!(legacy.properties.contains_key("user_id"));
        assert!(legacy.properties.contains_key("display_name"));
    }

    #[test]
    fn test_user_type_clashing_with_protocol_name() {
        let set = DescriptorSet::from_files(vec![file("c.proto", "")
            .with_message(message("connect").with_field(scalar("x", FieldKind::String)))
            .with_message(message("Ping"))
            .with_service(service("PingService", vec![get_method("Ping", "Ping", "Ping")]))]);
        let config = ConverterConfig::default().with_allow_get(true);

        assert!(matches!(
            convert_file(&set, "c.proto", &config),
            Err(ConvertError::NameCollision { ref name }) if name == "connect"
        ));
    }
}
