use thiserror::Error;

/// Result type for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Errors that can occur while converting a descriptor set to OpenAPI components
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A field or method references a type that is not present in the descriptor set
    #[error("unresolvable type reference `{type_name}` (referenced from `{referenced_from}`)")]
    UnresolvableTypeReference {
        type_name: String,
        referenced_from: String,
    },

    /// Two distinct definitions would produce the same component name
    #[error("name collision: `{name}` is defined more than once with different contents")]
    NameCollision { name: String },

    /// A field kind the field mapper has no rule for
    #[error("unsupported field shape `{kind}` for field `{field_name}` of `{type_name}`")]
    UnsupportedFieldShape {
        type_name: String,
        field_name: String,
        kind: String,
    },

    /// The requested file is not part of the descriptor set
    #[error("file `{0}` not found in descriptor set")]
    FileNotFound(String),

    /// Descriptor content that parses as JSON but is not a usable descriptor
    #[error("invalid descriptor: {0}")]
    Descriptor(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// TOML configuration parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Create an unresolvable type reference error
    pub fn unresolvable<T: ToString, F: ToString>(type_name: T, referenced_from: F) -> Self {
        Self::UnresolvableTypeReference {
            type_name: type_name.to_string(),
            referenced_from: referenced_from.to_string(),
        }
    }

    /// Create a name collision error
    pub fn name_collision<T: ToString>(name: T) -> Self {
        Self::NameCollision {
            name: name.to_string(),
        }
    }

    /// Create an unsupported field shape error
    pub fn unsupported_field<T: ToString, F: ToString, K: ToString>(
        type_name: T,
        field_name: F,
        kind: K,
    ) -> Self {
        Self::UnsupportedFieldShape {
            type_name: type_name.to_string(),
            field_name: field_name.to_string(),
            kind: kind.to_string(),
        }
    }

    /// Create a new descriptor error
    pub fn descriptor_error<T: ToString>(msg: T) -> Self {
        Self::Descriptor(msg.to_string())
    }

    /// Create a new configuration error
    pub fn config_error<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = ConvertError::unsupported_field("acme.v1.Legacy", "payload", "TYPE_GROUP");
        let msg = err.to_string();
        assert!(msg.contains("acme.v1.Legacy"));
        assert!(msg.contains("payload"));
        assert!(msg.contains("TYPE_GROUP"));

        let err = ConvertError::unresolvable("acme.v1.Missing", "acme.v1.User.friend");
        assert!(err.to_string().contains("acme.v1.Missing"));
        assert!(err.to_string().contains("acme.v1.User.friend"));
    }
}
