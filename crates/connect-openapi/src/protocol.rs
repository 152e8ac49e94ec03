/*!
Fixed Connect protocol schemas.

These fragments describe the transport rather than any user type: GET query
parameters, protocol headers, the error envelope and the `google.rpc` error
detail messages. Each is built on demand by a plain function and registered
by name; names are part of the output contract.
*/

use crate::{
    error::ConvertResult,
    specification::{AdditionalProperties, ComponentMap, Schema},
};
use serde_json::{json, Value};

/// Component id of the generic any-value schema
pub const GOOGLE_ANY_ID: &str = "google.protobuf.Any";

/// Error detail schemas offered by `connect.error.detail` when the override is on
pub const ERROR_DETAIL_REFS: [&str; 9] = [
    "google.rpc.DebugInfo",
    "google.rpc.Help",
    "google.rpc.LocalizedMessage",
    "google.rpc.RequestInfo",
    "google.rpc.ResourceInfo",
    "google.rpc.RetryInfo",
    "google.rpc.QuotaFailure",
    "google.rpc.PreconditionFailure",
    "google.rpc.BadRequest",
];

/// Canonical Connect error codes
pub const CONNECT_ERROR_CODES: [&str; 16] = [
    "canceled",
    "unknown",
    "invalid_argument",
    "deadline_exceeded",
    "not_found",
    "already_exists",
    "permission_denied",
    "resource_exhausted",
    "failed_precondition",
    "aborted",
    "out_of_range",
    "unimplemented",
    "internal",
    "unavailable",
    "data_loss",
    "unauthenticated",
];

/// Which protocol schemas a file needs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolFeatures {
    /// At least one method is reachable over HTTP GET
    pub has_get_requests: bool,
    /// The file declares at least one method
    pub has_methods: bool,
    /// Describe error details with the `google.rpc` schemas
    pub override_error_detail: bool,
}

/// Register every protocol schema `features` calls for, in fixed order
pub fn register_protocol_schemas(
    components: &mut ComponentMap,
    features: ProtocolFeatures,
) -> ConvertResult<()> {
    if features.has_get_requests {
        for (name, schema) in get_request_schemas() {
            components.insert(name, schema)?;
        }
    }

    if features.has_methods {
        components.insert("connect-protocol-version", protocol_version_header())?;
        components.insert("connect-timeout-header", timeout_header())?;

        let detail = if features.override_error_detail {
            register_error_detail_schemas(components)?;
            Schema {
                description: Some("A list of messages that carry the error details. There is a common set of message types for APIs to use.".to_string()),
                ..Schema::one_of_refs(ERROR_DETAIL_REFS)
            }
        } else {
            Schema::reference(GOOGLE_ANY_ID)
        };
        components.insert("connect.error", connect_error(detail))?;
        register_google_any(components)?;
    }
    Ok(())
}

/// Register the `google.rpc` error detail schemas; already registered equal entries are kept
pub fn register_error_detail_schemas(components: &mut ComponentMap) -> ConvertResult<()> {
    for (name, schema) in error_detail_schemas() {
        components.insert(name, schema)?;
    }
    Ok(())
}

/// Whether `name` is one of the fixed `google.rpc` error detail components
pub fn is_error_detail(name: &str) -> bool {
    error_detail_schemas().iter().any(|(id, _)| *id == name)
}

/// Register the generic any-value schema if it is not there yet
pub fn register_google_any(components: &mut ComponentMap) -> ConvertResult<()> {
    let (id, schema) = google_any();
    components.insert(id, schema)?;
    Ok(())
}

/// The generic "any structured value" schema, as an `(id, schema)` pair
pub fn google_any() -> (&'static str, Schema) {
    let schema = Schema {
        description: Some("Contains an arbitrary serialized message along with a @type that describes the type of the serialized message.".to_string()),
        additional_properties: Some(AdditionalProperties::Allowed(true)),
        ..Schema::object()
            .with_property("type", Schema::typed("string"))
            .with_property("value", Schema::scalar("string", Some("binary")))
            .with_property(
                "debug",
                Schema {
                    additional_properties: Some(AdditionalProperties::Allowed(true)),
                    ..Schema::object()
                },
            )
    };
    (GOOGLE_ANY_ID, schema)
}

/// Query parameter schemas used by GET requests: `encoding`, `base64`, `compression`, `connect`
pub fn get_request_schemas() -> Vec<(&'static str, Schema)> {
    vec![
        (
            "encoding",
            titled_enum(
                "encoding",
                "Define which encoding or 'Message-Codec' to use",
                &["proto", "json"],
            ),
        ),
        (
            "base64",
            Schema::typed("boolean")
                .with_title("base64")
                .with_description("Specifies if the message query param is base64 encoded, which may be required for binary data"),
        ),
        (
            "compression",
            titled_enum(
                "compression",
                "Which compression algorithm to use for this request",
                &["identity", "gzip", "br"],
            ),
        ),
        (
            "connect",
            titled_enum("connect", "Define the version of the Connect protocol", &["v1"]),
        ),
    ]
}

fn titled_enum(title: &str, description: &str, values: &[&str]) -> Schema {
    Schema {
        title: Some(title.to_string()),
        description: Some(description.to_string()),
        enum_values: values.iter().map(|v| Value::String(v.to_string())).collect(),
        ..Default::default()
    }
}

fn protocol_version_header() -> Schema {
    Schema {
        enum_values: vec![json!(1)],
        const_value: Some(json!(1)),
        ..Schema::typed("number")
            .with_title("Connect-Protocol-Version")
            .with_description("Define the version of the Connect protocol")
    }
}

fn timeout_header() -> Schema {
    Schema::typed("number")
        .with_title("Connect-Timeout-Ms")
        .with_description("Define the timeout, in ms")
}

fn connect_error(detail: Schema) -> Schema {
    let code = Schema {
        examples: vec![json!("not_found")],
        ..Schema::string_enum(CONNECT_ERROR_CODES).with_description(
            "The status code, which should be an enum value of [google.rpc.Code][google.rpc.Code].",
        )
    };
    let message = Schema::typed("string").with_description(
        "A developer-facing error message, which should be in English. Any user-facing error message should be localized and sent in the [google.rpc.Status.details][google.rpc.Status.details] field, or localized by the client.",
    );

    Schema {
        additional_properties: Some(AdditionalProperties::Allowed(true)),
        ..Schema::object()
            .with_title("Connect Error")
            .with_description(
                "Error type returned by Connect: https://connectrpc.com/docs/go/errors/#http-representation",
            )
            .with_property("code", code)
            .with_property("message", message)
            .with_property("detail", detail)
    }
}

fn text(description: &str) -> Schema {
    Schema::typed("string").with_description(description)
}

fn record(properties: Vec<(&str, Schema)>) -> Schema {
    properties
        .into_iter()
        .fold(Schema::object(), |schema, (name, property)| schema.with_property(name, property))
}

/// The `google.rpc` error detail messages, dependencies before dependents
pub fn error_detail_schemas() -> Vec<(&'static str, Schema)> {
    vec![
        (
            "google.rpc.ErrorInfo",
            record(vec![
                ("reason", text("The reason of the error in UPPER_SNAKE_CASE.")),
                ("domain", text("The logical grouping to which the error reason belongs.")),
                (
                    "metadata",
                    Schema::map(Schema::typed("string"))
                        .with_description("Additional structured details about the error."),
                ),
            ]),
        ),
        (
            "google.rpc.Duration",
            record(vec![
                ("seconds", Schema::scalar("integer", Some("int64"))),
                ("nanos", Schema::scalar("integer", Some("int32"))),
            ]),
        ),
        (
            "google.rpc.RetryInfo",
            record(vec![("retry_delay", Schema::reference("google.rpc.Duration"))]),
        ),
        (
            "google.rpc.DebugInfo",
            record(vec![
                (
                    "stack_entries",
                    Schema::array(Schema::typed("string")).with_description(
                        "The stack trace entries of the caller that led to the error being generated.",
                    ),
                ),
                ("detail", text("Additional debugging information provided by the server.")),
            ]),
        ),
        (
            "google.rpc.QuotaFailure.Violation",
            record(vec![
                ("subject", text("The subject on which the quota check failed.")),
                ("description", text("A description of how the quota check failed.")),
            ]),
        ),
        (
            "google.rpc.QuotaFailure",
            record(vec![(
                "violations",
                Schema::array(Schema::reference("google.rpc.QuotaFailure.Violation")),
            )]),
        ),
        (
            "google.rpc.PreconditionFailure.Violation",
            record(vec![
                ("type", text("The type of precondition failure.")),
                ("subject", text("The subject relative to the type.")),
                ("description", text("A description of how the precondition failed.")),
            ]),
        ),
        (
            "google.rpc.PreconditionFailure",
            record(vec![(
                "violations",
                Schema::array(Schema::reference("google.rpc.PreconditionFailure.Violation")),
            )]),
        ),
        (
            "google.rpc.BadRequest.FieldViolation",
            record(vec![
                ("field", text("A path that leads to a field in the request body.")),
                ("description", text("A description of why the request element is invalid.")),
                ("reason", text("The reason for the field-level error in UPPER_SNAKE_CASE.")),
            ]),
        ),
        (
            "google.rpc.BadRequest",
            record(vec![(
                "field_violations",
                Schema::array(Schema::reference("google.rpc.BadRequest.FieldViolation")),
            )]),
        ),
        (
            "google.rpc.RequestInfo",
            record(vec![
                ("request_id", text("An opaque string used for identifying requests in logs.")),
                ("serving_data", text("Data used to serve this request.")),
            ]),
        ),
        (
            "google.rpc.ResourceInfo",
            record(vec![
                ("resource_type", text("A name for the type of resource being accessed.")),
                ("resource_name", text("The name of the resource being accessed.")),
                ("owner", text("The owner of the resource.")),
                (
                    "description",
                    text("Describes what error is encountered when accessing this resource."),
                ),
            ]),
        ),
        (
            "google.rpc.Help",
            record(vec![
                ("url", text("The URL of the link.")),
                ("description", text("Describes what the link offers.")),
            ]),
        ),
        (
            "google.rpc.LocalizedMessage",
            record(vec![
                ("locale", text("The locale used for the message.")),
                ("message", text("The localized error message.")),
            ]),
        ),
    ]
}
