use connect_openapi::{
    convert_file, specification::AdditionalProperties, ComponentMap, ConvertError, Converter,
    ConverterConfig, DescriptorSet, OpenApiExporter, Schema,
};
use std::path::PathBuf;

const LIBRARY: &str = "acme/library/v1/library.proto";

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn library_set() -> DescriptorSet {
    DescriptorSet::from_json_file(fixture("library.json")).unwrap()
}

fn convert(config: &ConverterConfig) -> ComponentMap {
    convert_file(&library_set(), LIBRARY, config).unwrap()
}

#[test]
fn test_only_reachable_types_are_emitted() {
    let components = convert(&ConverterConfig::default());

    assert!(components.contains("acme.library.v1.Book"));
    assert!(components.contains("acme.common.v1.Author"));
    assert!(components.contains("acme.library.v1.Genre"));
    assert!(components.contains("acme.library.v1.ShelveBookResponse"));

    assert!(!components.contains("acme.common.v1.Unused"));
    assert!(!components.contains("acme.library.v1.Book.AttributesEntry"));
    assert!(!components.contains("google.protobuf.Timestamp"));
}

#[test]
fn test_collected_types_precede_protocol_schemas() {
    let components = convert(&ConverterConfig::default());
    let names: Vec<_> = components.names().collect();

    assert_eq!(names[0], "acme.library.v1.Book");
    let first_protocol = names
        .iter()
        .position(|n| *n == "connect-protocol-version")
        .unwrap();
    assert!(names[..first_protocol].iter().all(|n| n.starts_with("acme.")));
    assert_eq!(names.last(), Some(&"google.protobuf.Any"));
}

#[test]
fn test_book_schema_shape() {
    let components = convert(&ConverterConfig::default());
    let book = components.get("acme.library.v1.Book").unwrap();

    assert_eq!(book.title.as_deref(), Some("Book"));
    assert_eq!(book.description.as_deref(), Some("A book held by the library."));
    assert_eq!(book.additional_properties, Some(AdditionalProperties::Allowed(false)));

    let keys: Vec<_> = book.properties.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec!["isbn", "pageCount", "authors", "genre", "sequel", "attributes", "cover"]
    );

    assert_eq!(book.properties["pageCount"].minimum, Some(0.0));
    assert_eq!(
        book.properties["authors"],
        Schema::array(Schema::reference("acme.common.v1.Author"))
    );
    assert_eq!(
        book.properties["sequel"],
        Schema::reference("acme.library.v1.Book")
    );

    let attributes = &book.properties["attributes"];
    assert_eq!(attributes.format, None);
    match &attributes.additional_properties {
        Some(AdditionalProperties::Schema(values)) => {
            assert_eq!(values.format.as_deref(), Some("int64"))
        }
        other => panic!("expected map values, got {:?}", other),
    }

    assert_eq!(book.properties["cover"].content_encoding.as_deref(), Some("base64"));
}

#[test]
fn test_imported_message_uses_inline_timestamp() {
    let components = convert(&ConverterConfig::default());
    let author = components.get("acme.common.v1.Author").unwrap();

    assert_eq!(
        author.properties["born"],
        Schema::scalar("string", Some("date-time"))
    );
    assert!(author.properties.contains_key("fullName"));
}

#[test]
fn test_enum_values_and_comments() {
    let components = convert(&ConverterConfig::default());
    let genre = components.get("acme.library.v1.Genre").unwrap();

    let values: Vec<_> = genre
        .enum_values
        .iter()
        .filter_map(|v| v.as_str())
        .collect();
    assert_eq!(
        values,
        vec!["GENRE_UNSPECIFIED", "GENRE_FICTION", "GENRE_HISTORY"]
    );
}

#[test]
fn test_allow_get_adds_query_schemas() {
    let without = convert(&ConverterConfig::default());
    assert!(!without.contains("encoding"));
    assert!(without.contains("connect.error"));

    let with = convert(&ConverterConfig::default().with_allow_get(true));
    for name in ["encoding", "base64", "compression", "connect"] {
        assert!(with.contains(name), "{name} missing");
    }
    assert!(with.dangling_references().is_empty());
}

#[test]
fn test_error_detail_override() {
    let components = convert(&ConverterConfig::default().with_error_detail_override(true));

    for name in [
        "google.rpc.RetryInfo",
        "google.rpc.DebugInfo",
        "google.rpc.QuotaFailure",
        "google.rpc.QuotaFailure.Violation",
        "google.rpc.BadRequest.FieldViolation",
        "google.rpc.LocalizedMessage",
    ] {
        assert!(components.contains(name), "{name} missing");
    }
    assert!(components.dangling_references().is_empty());
}

#[test]
fn test_proto_names_option() {
    let mut config = ConverterConfig::default();
    config.use_json_names = false;
    let components = convert(&config);
    let book = components.get("acme.library.v1.Book").unwrap();

    assert!(book.properties.contains_key("page_count"));
    assert!(!book.properties.contains_key("pageCount"));
}

#[test]
fn test_document_round_trip_through_yaml() {
    let converter = Converter::new(ConverterConfig::default());
    let spec = converter.generate_document(&library_set(), LIBRARY).unwrap();
    assert_eq!(spec.info.title, "acme.library.v1");

    let yaml = OpenApiExporter::to_yaml(&spec).unwrap();
    let back: connect_openapi::OpenApiSpec = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, spec);
}

#[test]
fn test_dangling_type_name_is_reported() {
    let broken = r#"{
        "file": [{
            "name": "broken.proto",
            "messageType": [{
                "name": "Holder",
                "field": [{"name": "ghost", "number": 1, "type": "TYPE_MESSAGE", "typeName": ".nowhere.Ghost"}]
            }]
        }]
    }"#;
    let set = DescriptorSet::from_json(broken).unwrap();
    let err = convert_file(&set, "broken.proto", &ConverterConfig::default()).unwrap_err();

    match err {
        ConvertError::UnresolvableTypeReference { type_name, .. } => {
            assert_eq!(type_name, "nowhere.Ghost")
        }
        other => panic!("unexpected error: {other}"),
    }
}
