use crate::{
    collector::{collect_file, TypeRegistry},
    config::ConverterConfig,
    descriptor::{DescriptorSet, FileDescriptor, IdempotencyLevel, MethodDescriptor},
    error::{ConvertError, ConvertResult},
    protocol::{register_protocol_schemas, ProtocolFeatures},
    specification::{ComponentMap, OpenApiSpec},
    synthesizer,
};
use std::collections::HashSet;
use tracing::debug;

/// State of one conversion call. Created fresh per file and dropped at the end.
pub(crate) struct ConversionState<'a> {
    pub(crate) config: &'a ConverterConfig,
    pub(crate) registry: TypeRegistry<'a>,
    pub(crate) components: ComponentMap,
    /// Names being or already synthesized
    pub(crate) visited: HashSet<String>,
}

impl<'a> ConversionState<'a> {
    fn new(config: &'a ConverterConfig, registry: TypeRegistry<'a>) -> Self {
        Self {
            config,
            registry,
            components: ComponentMap::new(),
            visited: HashSet::new(),
        }
    }

    /// Synthesize every collected type in discovery order
    fn synthesize_all(&mut self) -> ConvertResult<()> {
        let names: Vec<_> = self
            .registry
            .iter()
            .filter(|(_, ty)| !ty.is_map_entry())
            .map(|(name, _)| name.to_string())
            .collect();
        for name in names {
            synthesizer::synthesize(self, &name, &name)?;
        }
        Ok(())
    }
}

/// Converts descriptor files into OpenAPI components
pub struct Converter {
    config: ConverterConfig,
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Build the component map for one file of the set
    pub fn convert_file(
        &self,
        set: &DescriptorSet,
        file_name: &str,
    ) -> ConvertResult<ComponentMap> {
        convert_file(set, file_name, &self.config)
    }

    /// Build a full OpenAPI document for one file of the set
    pub fn generate_document(
        &self,
        set: &DescriptorSet,
        file_name: &str,
    ) -> ConvertResult<OpenApiSpec> {
        let file = set.file(file_name)?;
        let schemas = self.convert_file(set, file_name)?;
        let title = self.config.title.clone().unwrap_or_else(|| default_title(file));
        Ok(OpenApiSpec::new(
            &self.config.openapi_version,
            &title,
            &self.config.version,
            schemas,
        ))
    }
}

fn default_title(file: &FileDescriptor) -> String {
    if file.package.is_empty() {
        file.name.clone()
    } else {
        file.package.clone()
    }
}

/// Whether a method can be called with a Connect GET request.
///
/// A `google.api.http` get rule is REST transcoding and does not count.
pub fn method_has_get(config: &ConverterConfig, method: &MethodDescriptor) -> bool {
    !method.is_streaming()
        && config.allow_get
        && method.idempotency_level == IdempotencyLevel::NoSideEffects
}

/// Scan the services of a file for the protocol features they need
pub fn scan_features(config: &ConverterConfig, file: &FileDescriptor) -> ProtocolFeatures {
    let mut features = ProtocolFeatures {
        override_error_detail: config.override_connect_error_detail,
        ..Default::default()
    };
    for method in file.services.iter().flat_map(|s| &s.methods) {
        features.has_methods = true;
        if method_has_get(config, method) {
            features.has_get_requests = true;
        }
    }
    features
}

/// Convert one file of `set` into its ordered component map.
///
/// Collected types come first in discovery order, followed by the protocol
/// schemas the file's methods need.
pub fn convert_file(
    set: &DescriptorSet,
    file_name: &str,
    config: &ConverterConfig,
) -> ConvertResult<ComponentMap> {
    let file = set.file(file_name)?;

    debug!(file = file_name, "start collection");
    let registry = collect_file(set, file)?;

    let mut state = ConversionState::new(config, registry);
    state.synthesize_all()?;

    let features = scan_features(config, file);
    debug!(
        file = file_name,
        has_methods = features.has_methods,
        has_get_requests = features.has_get_requests,
        "registering protocol schemas"
    );
    register_protocol_schemas(&mut state.components, features)?;

    if let Some((from, target)) = state.components.dangling_references().into_iter().next() {
        return Err(ConvertError::unresolvable(target, from));
    }

    debug!(file = file_name, components = state.components.len(), "conversion complete");
    Ok(state.components)
}
