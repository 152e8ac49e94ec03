/*!
# connect-openapi

OpenAPI 3.1 component generation for Connect RPC services.

This crate turns the messages, enums and services of a protobuf file into the
`components.schemas` section of an OpenAPI document, together with the fixed
schemas every Connect API relies on (error envelope, protocol headers, GET
query parameters and the `google.rpc` error details).

## Features

- JSON `FileDescriptorSet` loading (as written by `buf build`)
- Transitive type collection across imported files
- Cycle-safe, deduplicated schema synthesis for recursive messages
- Protocol schemas included only when the file's methods need them
- JSON and YAML export

## Usage

```rust,no_run
use connect_openapi::{Converter, ConverterConfig, DescriptorSet, OpenApiExporter};

let set = DescriptorSet::from_json_file("descriptor.json").unwrap();
let converter = Converter::new(ConverterConfig::default());
let spec = converter.generate_document(&set, "acme/v1/user.proto").unwrap();
println!("{}", OpenApiExporter::to_yaml(&spec).unwrap());
```
*/

// Re-export main types
pub use crate::{
    collector::{collect_file, TypeDescriptor, TypeRegistry},
    config::{ConverterConfig, OutputFormat},
    converter::{convert_file, Converter},
    descriptor::DescriptorSet,
    error::{ConvertError, ConvertResult},
    export::OpenApiExporter,
    protocol::ProtocolFeatures,
    specification::{ComponentMap, OpenApiSpec, Schema},
};

// Core modules
pub mod config;
pub mod error;
pub mod specification;

// Input model
pub mod descriptor;

// Conversion pipeline
pub mod collector;
pub mod converter;
pub mod fields;
pub mod protocol;
mod synthesizer;

// Export functionality
pub mod export;

// Test utilities
#[cfg(test)]
mod test_utils;
