use crate::error::{ConvertError, ConvertResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Prefix of every local component reference
pub const COMPONENT_REF_PREFIX: &str = "#/components/schemas/";

/// OpenAPI 3.1 document carrying the generated components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSpec {
    /// OpenAPI specification version
    pub openapi: String,

    /// API metadata
    pub info: ApiInfo,

    /// API paths. Path generation lives outside this crate, so this is
    /// usually empty.
    #[serde(default)]
    pub paths: IndexMap<String, Value>,

    /// Reusable components
    pub components: Components,
}

/// API metadata information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiInfo {
    /// API title
    pub title: String,

    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// API version
    pub version: String,
}

/// Reusable components
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Components {
    /// Reusable schemas
    #[serde(default)]
    pub schemas: ComponentMap,
}

/// Value of a schema's `type` keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// Value of a schema's `additionalProperties` keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Allowed(bool),
    Schema(Box<Schema>),
}

/// Schema for data types
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Schema {
    /// Reference to another schema
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Schema title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Data type
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    /// Format specifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Encoding of string content, e.g. `base64`
    #[serde(rename = "contentEncoding", skip_serializing_if = "Option::is_none")]
    pub content_encoding: Option<String>,

    /// Description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Example values
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub examples: Vec<Value>,

    /// Nullable flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,

    /// Properties for object types
    #[serde(skip_serializing_if = "IndexMap::is_empty", default)]
    pub properties: IndexMap<String, Schema>,

    /// Required properties
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub required: Vec<String>,

    /// Additional properties for object types
    #[serde(rename = "additionalProperties", skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<AdditionalProperties>,

    /// Items schema for arrays
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    /// Enum values
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty", default)]
    pub enum_values: Vec<Value>,

    /// Single allowed value
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub const_value: Option<Value>,

    /// OneOf composition
    #[serde(rename = "oneOf", skip_serializing_if = "Vec::is_empty", default)]
    pub one_of: Vec<Schema>,

    /// Validation: minimum value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    /// Validation: pattern
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl Schema {
    /// Schema of the given primitive type
    pub fn typed(schema_type: &str) -> Self {
        Self {
            schema_type: Some(SchemaType::Single(schema_type.to_string())),
            ..Default::default()
        }
    }

    /// Scalar schema with an optional format
    pub fn scalar(schema_type: &str, format: Option<&str>) -> Self {
        Self {
            format: format.map(str::to_string),
            ..Self::typed(schema_type)
        }
    }

    /// Empty object schema
    pub fn object() -> Self {
        Self::typed("object")
    }

    /// Array schema with the given items
    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::typed("array")
        }
    }

    /// Object whose values all match `values` and whose keys are free-form strings
    pub fn map(values: Schema) -> Self {
        Self {
            additional_properties: Some(AdditionalProperties::Schema(Box::new(values))),
            ..Self::object()
        }
    }

    /// String enumeration
    pub fn string_enum<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enum_values: values.into_iter().map(|v| Value::String(v.into())).collect(),
            ..Self::typed("string")
        }
    }

    /// Reference to a named component
    pub fn reference(component: &str) -> Self {
        Self {
            reference: Some(format!("{}{}", COMPONENT_REF_PREFIX, component)),
            ..Default::default()
        }
    }

    /// OneOf over references to named components
    pub fn one_of_refs<'a, I>(components: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        Self {
            one_of: components.into_iter().map(Schema::reference).collect(),
            ..Default::default()
        }
    }

    /// Set the title
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Add a property, keeping declaration order
    pub fn with_property(mut self, name: &str, schema: Schema) -> Self {
        self.properties.insert(name.to_string(), schema);
        self
    }

    /// Component name this schema points at, if it is a local reference
    pub fn ref_target(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.strip_prefix(COMPONENT_REF_PREFIX))
    }

    /// Visit every local reference reachable inside this schema
    pub fn for_each_reference<'s>(&'s self, visit: &mut impl FnMut(&'s str)) {
        if let Some(target) = self.ref_target() {
            visit(target);
        }
        for property in self.properties.values() {
            property.for_each_reference(visit);
        }
        if let Some(items) = &self.items {
            items.for_each_reference(visit);
        }
        if let Some(AdditionalProperties::Schema(values)) = &self.additional_properties {
            values.for_each_reference(visit);
        }
        for alternative in &self.one_of {
            alternative.for_each_reference(visit);
        }
    }
}

/// Ordered mapping from component name to schema.
///
/// A name is inserted at most once. Inserting a name again with an equal
/// schema is a no-op; inserting it with a different schema is a
/// [`ConvertError::NameCollision`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMap(IndexMap<String, Schema>);

impl ComponentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finished schema. Returns `true` if the name was new.
    pub fn insert(&mut self, name: &str, schema: Schema) -> ConvertResult<bool> {
        match self.0.get(name) {
            Some(existing) if *existing == schema => Ok(false),
            Some(_) => Err(ConvertError::name_collision(name)),
            None => {
                self.0.insert(name.to_string(), schema);
                Ok(true)
            }
        }
    }

    /// Reserve a slot for a schema that is still being built.
    ///
    /// The slot keeps its position when it is later completed, so output
    /// order follows the order in which names were first reached.
    pub(crate) fn reserve(&mut self, name: &str) -> bool {
        if self.0.contains_key(name) {
            return false;
        }
        self.0.insert(name.to_string(), Schema::default());
        true
    }

    /// Fill a reserved slot
    pub(crate) fn complete(&mut self, name: &str, schema: Schema) {
        if let Some(slot) = self.0.get_mut(name) {
            *slot = schema;
        }
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Component names in insertion order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// References that do not resolve to a component in this map, as
    /// `(referencing component, missing target)` pairs
    pub fn dangling_references(&self) -> Vec<(String, String)> {
        let mut dangling = Vec::new();
        for (name, schema) in &self.0 {
            schema.for_each_reference(&mut |target| {
                if !self.0.contains_key(target) {
                    dangling.push((name.clone(), target.to_string()));
                }
            });
        }
        dangling
    }
}

impl OpenApiSpec {
    /// Create a new document around a component map
    pub fn new(openapi: &str, title: &str, version: &str, schemas: ComponentMap) -> Self {
        Self {
            openapi: openapi.to_string(),
            info: ApiInfo {
                title: title.to_string(),
                description: None,
                version: version.to_string(),
            },
            paths: IndexMap::new(),
            components: Components { schemas },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_serializes_as_dollar_ref() {
        let schema = Schema::reference("acme.v1.User");
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json, serde_json::json!({"$ref": "#/components/schemas/acme.v1.User"}));
        assert_eq!(schema.ref_target(), Some("acme.v1.User"));
    }

    #[test]
    fn test_multiple_types_and_additional_properties() {
        let schema = Schema {
            schema_type: Some(SchemaType::Multiple(vec![
                "integer".to_string(),
                "string".to_string(),
            ])),
            additional_properties: Some(AdditionalProperties::Allowed(false)),
            ..Default::default()
        };
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(json["type"], serde_json::json!(["integer", "string"]));
        assert_eq!(json["additionalProperties"], serde_json::json!(false));

        let back: Schema = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_insert_is_idempotent_for_equal_schemas() {
        let mut map = ComponentMap::new();
        assert!(map.insert("base64", Schema::typed("boolean")).unwrap());
        assert!(!map.insert("base64", Schema::typed("boolean")).unwrap());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_insert_rejects_conflicting_schema() {
        let mut map = ComponentMap::new();
        map.insert("connect", Schema::object()).unwrap();
        let err = map.insert("connect", Schema::string_enum(["v1"])).unwrap_err();
        assert!(matches!(err, ConvertError::NameCollision { ref name } if name == "connect"));
    }

    #[test]
    fn test_reserved_slot_keeps_position() {
        let mut map = ComponentMap::new();
        assert!(map.reserve("A"));
        map.insert("B", Schema::object()).unwrap();
        assert!(!map.reserve("A"));
        map.complete("A", Schema::typed("string"));

        let names: Vec<_> = map.names().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(map.get("A"), Some(&Schema::typed("string")));
    }

    #[test]
    fn test_dangling_reference_detection() {
        let mut map = ComponentMap::new();
        map.insert(
            "Outer",
            Schema::object()
                .with_property("inner", Schema::reference("Inner"))
                .with_property("list", Schema::array(Schema::reference("Missing"))),
        )
        .unwrap();
        map.insert("Inner", Schema::object()).unwrap();

        assert_eq!(
            map.dangling_references(),
            vec![("Outer".to_string(), "Missing".to_string())]
        );
    }
}
