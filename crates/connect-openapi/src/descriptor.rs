/*!
Typed protobuf descriptor model and its JSON loader.

The loader reads the JSON rendering of a `google.protobuf.FileDescriptorSet`,
as written by `buf build --as-file-descriptor-set -o set.json`. Extension
options such as `(google.api.http)` appear there as bracketed keys
(`"[google.api.http]"`), so annotation-driven behavior needs no reflective
decoding stack.

Everything downstream works on the closed set of types in this module; raw
JSON never leaves the loader.
*/

use crate::error::{ConvertError, ConvertResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// A set of protobuf files, typically one file plus its transitive imports
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DescriptorSet {
    pub files: Vec<FileDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileDescriptor {
    pub name: String,
    pub package: String,
    pub dependencies: Vec<String>,
    pub messages: Vec<MessageDescriptor>,
    pub enums: Vec<EnumDescriptor>,
    pub services: Vec<ServiceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageDescriptor {
    pub name: String,
    /// Fully qualified name without the leading dot
    pub full_name: String,
    pub fields: Vec<FieldDescriptor>,
    pub nested_messages: Vec<MessageDescriptor>,
    pub nested_enums: Vec<EnumDescriptor>,
    pub oneofs: Vec<String>,
    /// Synthetic entry type generated by protoc for a `map<K, V>` field
    pub is_map_entry: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub json_name: String,
    pub number: i32,
    pub kind: FieldKind,
    pub label: FieldLabel,
    pub oneof_index: Option<usize>,
    /// Declared with the proto3 `optional` keyword
    pub proto3_optional: bool,
    pub description: Option<String>,
}

/// Declared kind of a field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Double,
    Float,
    Int64,
    UInt64,
    Int32,
    Fixed64,
    Fixed32,
    Bool,
    String,
    Bytes,
    UInt32,
    SFixed32,
    SFixed64,
    SInt32,
    SInt64,
    /// Fully qualified message name without the leading dot
    Message(String),
    /// Fully qualified enum name without the leading dot
    Enum(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldLabel {
    #[default]
    Optional,
    Required,
    Repeated,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumDescriptor {
    pub name: String,
    pub full_name: String,
    pub values: Vec<EnumValueDescriptor>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumValueDescriptor {
    pub name: String,
    pub number: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServiceDescriptor {
    pub name: String,
    pub full_name: String,
    pub methods: Vec<MethodDescriptor>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MethodDescriptor {
    pub name: String,
    /// Request message, fully qualified without the leading dot
    pub input_type: String,
    /// Response message, fully qualified without the leading dot
    pub output_type: String,
    pub client_streaming: bool,
    pub server_streaming: bool,
    pub idempotency_level: IdempotencyLevel,
    /// Path template of a `google.api.http` rule using the `get` verb
    pub http_get: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdempotencyLevel {
    #[default]
    Unknown,
    NoSideEffects,
    Idempotent,
}

impl FieldKind {
    /// Name of the referenced message or enum, if any
    pub fn type_name(&self) -> Option<&str> {
        match self {
            FieldKind::Message(name) | FieldKind::Enum(name) => Some(name),
            _ => None,
        }
    }
}

impl FieldDescriptor {
    pub fn is_repeated(&self) -> bool {
        self.label == FieldLabel::Repeated
    }
}

impl MethodDescriptor {
    pub fn is_streaming(&self) -> bool {
        self.client_streaming || self.server_streaming
    }
}

impl DescriptorSet {
    pub fn from_files(files: Vec<FileDescriptor>) -> Self {
        Self { files }
    }

    /// Parse the JSON rendering of a `FileDescriptorSet`
    pub fn from_json(text: &str) -> ConvertResult<Self> {
        let raw: RawFileDescriptorSet = serde_json::from_str(text)?;
        let files = raw
            .file
            .iter()
            .map(load_file)
            .collect::<ConvertResult<Vec<_>>>()?;
        Ok(Self { files })
    }

    /// Read and parse a JSON descriptor set from disk
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConvertResult<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        Self::from_json(&text)
    }

    /// Look up a file by its proto path (e.g. `acme/v1/user.proto`)
    pub fn file(&self, name: &str) -> ConvertResult<&FileDescriptor> {
        self.files
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ConvertError::FileNotFound(name.to_string()))
    }
}

// =============================================================================
// Raw JSON shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawFileDescriptorSet {
    #[serde(default)]
    file: Vec<RawFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFile {
    name: Option<String>,
    package: Option<String>,
    #[serde(default)]
    dependency: Vec<String>,
    #[serde(default)]
    message_type: Vec<RawMessage>,
    #[serde(default)]
    enum_type: Vec<RawEnum>,
    #[serde(default)]
    service: Vec<RawService>,
    source_code_info: Option<RawSourceCodeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    name: Option<String>,
    #[serde(default)]
    field: Vec<RawField>,
    #[serde(default)]
    nested_type: Vec<RawMessage>,
    #[serde(default)]
    enum_type: Vec<RawEnum>,
    #[serde(default)]
    oneof_decl: Vec<RawOneof>,
    #[serde(default)]
    options: RawOptions,
}

#[derive(Debug, Deserialize)]
struct RawOneof {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawField {
    name: Option<String>,
    json_name: Option<String>,
    number: Option<i32>,
    label: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<Value>,
    type_name: Option<String>,
    oneof_index: Option<usize>,
    #[serde(default)]
    proto3_optional: bool,
}

#[derive(Debug, Deserialize)]
struct RawEnum {
    name: Option<String>,
    #[serde(default)]
    value: Vec<RawEnumValue>,
}

#[derive(Debug, Deserialize)]
struct RawEnumValue {
    name: Option<String>,
    number: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct RawService {
    name: Option<String>,
    #[serde(default)]
    method: Vec<RawMethod>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMethod {
    name: Option<String>,
    input_type: Option<String>,
    output_type: Option<String>,
    #[serde(default)]
    client_streaming: bool,
    #[serde(default)]
    server_streaming: bool,
    #[serde(default)]
    options: RawOptions,
}

#[derive(Debug, Deserialize)]
struct RawSourceCodeInfo {
    #[serde(default)]
    location: Vec<RawLocation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLocation {
    #[serde(default)]
    path: Vec<i32>,
    leading_comments: Option<String>,
}

type RawOptions = BTreeMap<String, Value>;

// =============================================================================
// Loading
// =============================================================================

// Field numbers from descriptor.proto, used as source-code-info paths.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const FILE_SERVICE: i32 = 6;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const ENUM_VALUE: i32 = 2;
const SERVICE_METHOD: i32 = 2;

/// Leading comments of one file, keyed by source-code-info path
struct Comments(HashMap<Vec<i32>, String>);

impl Comments {
    fn new(info: Option<&RawSourceCodeInfo>) -> Self {
        let mut map = HashMap::new();
        for loc in info.map(|i| i.location.as_slice()).unwrap_or_default() {
            let Some(text) = loc.leading_comments.as_deref() else {
                continue;
            };
            let text = clean_comment(text);
            if !text.is_empty() {
                map.insert(loc.path.clone(), text);
            }
        }
        Self(map)
    }

    fn at(&self, path: &[i32]) -> Option<String> {
        self.0.get(path).cloned()
    }
}

fn clean_comment(text: &str) -> String {
    text.lines()
        .map(|line| line.strip_prefix(' ').unwrap_or(line).trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn load_file(raw: &RawFile) -> ConvertResult<FileDescriptor> {
    let name = raw
        .name
        .clone()
        .ok_or_else(|| ConvertError::descriptor_error("file without a name"))?;
    let package = raw.package.clone().unwrap_or_default();
    let comments = Comments::new(raw.source_code_info.as_ref());

    let messages = raw
        .message_type
        .iter()
        .enumerate()
        .map(|(i, m)| load_message(m, &package, &[FILE_MESSAGE_TYPE, i as i32], &comments))
        .collect::<ConvertResult<Vec<_>>>()?;

    let enums = raw
        .enum_type
        .iter()
        .enumerate()
        .map(|(i, e)| load_enum(e, &package, &[FILE_ENUM_TYPE, i as i32], &comments))
        .collect::<ConvertResult<Vec<_>>>()?;

    let services = raw
        .service
        .iter()
        .enumerate()
        .map(|(i, s)| load_service(s, &package, &[FILE_SERVICE, i as i32], &comments))
        .collect::<ConvertResult<Vec<_>>>()?;

    Ok(FileDescriptor {
        name,
        package,
        dependencies: raw.dependency.clone(),
        messages,
        enums,
        services,
    })
}

fn qualify(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{scope}.{name}")
    }
}

fn child_path(path: &[i32], field: i32, index: usize) -> Vec<i32> {
    let mut child = path.to_vec();
    child.push(field);
    child.push(index as i32);
    child
}

fn required_name(name: &Option<String>, what: &str, scope: &str) -> ConvertResult<String> {
    name.clone()
        .filter(|n| !n.is_empty())
        .ok_or_else(|| {
            ConvertError::descriptor_error(format!("{what} without a name in `{scope}`"))
        })
}

fn load_message(
    raw: &RawMessage,
    scope: &str,
    path: &[i32],
    comments: &Comments,
) -> ConvertResult<MessageDescriptor> {
    let name = required_name(&raw.name, "message", scope)?;
    let full_name = qualify(scope, &name);

    let fields = raw
        .field
        .iter()
        .enumerate()
        .map(|(i, f)| load_field(f, &full_name, &child_path(path, MESSAGE_FIELD, i), comments))
        .collect::<ConvertResult<Vec<_>>>()?;

    let nested_messages = raw
        .nested_type
        .iter()
        .enumerate()
        .map(|(i, m)| {
            load_message(m, &full_name, &child_path(path, MESSAGE_NESTED_TYPE, i), comments)
        })
        .collect::<ConvertResult<Vec<_>>>()?;

    let nested_enums = raw
        .enum_type
        .iter()
        .enumerate()
        .map(|(i, e)| load_enum(e, &full_name, &child_path(path, MESSAGE_ENUM_TYPE, i), comments))
        .collect::<ConvertResult<Vec<_>>>()?;

    Ok(MessageDescriptor {
        is_map_entry: raw
            .options
            .get("mapEntry")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        oneofs: raw
            .oneof_decl
            .iter()
            .map(|o| o.name.clone().unwrap_or_default())
            .collect(),
        description: comments.at(path),
        name,
        full_name,
        fields,
        nested_messages,
        nested_enums,
    })
}

fn load_field(
    raw: &RawField,
    owner: &str,
    path: &[i32],
    comments: &Comments,
) -> ConvertResult<FieldDescriptor> {
    let name = required_name(&raw.name, "field", owner)?;
    let kind = field_kind(raw, owner, &name)?;
    let label = match raw.label.as_ref().map(enum_token) {
        None => FieldLabel::Optional,
        Some(token) => match token.as_str() {
            "LABEL_OPTIONAL" | "1" => FieldLabel::Optional,
            "LABEL_REQUIRED" | "2" => FieldLabel::Required,
            "LABEL_REPEATED" | "3" => FieldLabel::Repeated,
            other => {
                return Err(ConvertError::unsupported_field(
                    owner,
                    &name,
                    format!("label {other}"),
                ))
            }
        },
    };

    Ok(FieldDescriptor {
        json_name: raw.json_name.clone().unwrap_or_else(|| json_name(&name)),
        number: raw.number.unwrap_or_default(),
        oneof_index: raw.oneof_index,
        proto3_optional: raw.proto3_optional,
        description: comments.at(path),
        name,
        kind,
        label,
    })
}

/// Render an enum-valued JSON token (`"TYPE_STRING"` or `9`) as a string
fn enum_token(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_kind(raw: &RawField, owner: &str, field: &str) -> ConvertResult<FieldKind> {
    let type_name = raw
        .type_name
        .as_deref()
        .map(|t| t.trim_start_matches('.').to_string());

    let token = match raw.kind.as_ref().map(enum_token) {
        Some(token) => token,
        None => {
            return Err(ConvertError::unsupported_field(
                owner,
                field,
                type_name.map_or("missing type".to_string(), |t| format!("unresolved `{t}`")),
            ))
        }
    };

    let kind = match token.as_str() {
        "TYPE_DOUBLE" | "1" => FieldKind::Double,
        "TYPE_FLOAT" | "2" => FieldKind::Float,
        "TYPE_INT64" | "3" => FieldKind::Int64,
        "TYPE_UINT64" | "4" => FieldKind::UInt64,
        "TYPE_INT32" | "5" => FieldKind::Int32,
        "TYPE_FIXED64" | "6" => FieldKind::Fixed64,
        "TYPE_FIXED32" | "7" => FieldKind::Fixed32,
        "TYPE_BOOL" | "8" => FieldKind::Bool,
        "TYPE_STRING" | "9" => FieldKind::String,
        "TYPE_MESSAGE" | "11" | "TYPE_ENUM" | "14" => {
            let target = type_name.filter(|t| !t.is_empty()).ok_or_else(|| {
                ConvertError::unsupported_field(owner, field, format!("{token} without typeName"))
            })?;
            if token == "TYPE_ENUM" || token == "14" {
                FieldKind::Enum(target)
            } else {
                FieldKind::Message(target)
            }
        }
        "TYPE_BYTES" | "12" => FieldKind::Bytes,
        "TYPE_UINT32" | "13" => FieldKind::UInt32,
        "TYPE_SFIXED32" | "15" => FieldKind::SFixed32,
        "TYPE_SFIXED64" | "16" => FieldKind::SFixed64,
        "TYPE_SINT32" | "17" => FieldKind::SInt32,
        "TYPE_SINT64" | "18" => FieldKind::SInt64,
        // TYPE_GROUP (10) and anything unknown
        other => return Err(ConvertError::unsupported_field(owner, field, other)),
    };
    Ok(kind)
}

/// protoc's default JSON name: snake_case to lowerCamelCase
pub(crate) fn json_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn load_enum(
    raw: &RawEnum,
    scope: &str,
    path: &[i32],
    comments: &Comments,
) -> ConvertResult<EnumDescriptor> {
    let name = required_name(&raw.name, "enum", scope)?;
    let full_name = qualify(scope, &name);
    let values = raw
        .value
        .iter()
        .enumerate()
        .map(|(i, v)| -> ConvertResult<EnumValueDescriptor> {
            Ok(EnumValueDescriptor {
                name: required_name(&v.name, "enum value", &full_name)?,
                number: v.number.unwrap_or_default(),
                description: comments.at(&child_path(path, ENUM_VALUE, i)),
            })
        })
        .collect::<ConvertResult<Vec<_>>>()?;

    Ok(EnumDescriptor {
        description: comments.at(path),
        name,
        full_name,
        values,
    })
}

fn load_service(
    raw: &RawService,
    package: &str,
    path: &[i32],
    comments: &Comments,
) -> ConvertResult<ServiceDescriptor> {
    let name = required_name(&raw.name, "service", package)?;
    let full_name = qualify(package, &name);

    let methods = raw
        .method
        .iter()
        .enumerate()
        .map(|(i, m)| -> ConvertResult<MethodDescriptor> {
            let method_name = required_name(&m.name, "method", &full_name)?;
            let endpoint = |t: &Option<String>, what: &str| {
                t.as_deref()
                    .map(|t| t.trim_start_matches('.').to_string())
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| {
                        ConvertError::descriptor_error(format!(
                            "method `{full_name}.{method_name}` has no {what} type"
                        ))
                    })
            };
            Ok(MethodDescriptor {
                input_type: endpoint(&m.input_type, "input")?,
                output_type: endpoint(&m.output_type, "output")?,
                client_streaming: m.client_streaming,
                server_streaming: m.server_streaming,
                idempotency_level: idempotency_level(&m.options),
                http_get: http_get_rule(&m.options),
                description: comments.at(&child_path(path, SERVICE_METHOD, i)),
                name: method_name,
            })
        })
        .collect::<ConvertResult<Vec<_>>>()?;

    Ok(ServiceDescriptor {
        description: comments.at(path),
        name,
        full_name,
        methods,
    })
}

fn idempotency_level(options: &RawOptions) -> IdempotencyLevel {
    match options.get("idempotencyLevel").map(enum_token).as_deref() {
        Some("NO_SIDE_EFFECTS") | Some("1") => IdempotencyLevel::NoSideEffects,
        Some("IDEMPOTENT") | Some("2") => IdempotencyLevel::Idempotent,
        _ => IdempotencyLevel::Unknown,
    }
}

/// Path of a `google.api.http` rule that uses the `get` verb
fn http_get_rule(options: &RawOptions) -> Option<String> {
    let rule = options.get("[google.api.http]")?.as_object()?;
    rule.get("get")
        .and_then(Value::as_str)
        .map(str::to_string)
}
