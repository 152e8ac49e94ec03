use anyhow::{bail, Context};
use clap::Args;
use connect_openapi::{
    export::output_path, Converter, ConverterConfig, DescriptorSet, OpenApiExporter, OutputFormat,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// JSON encoded FileDescriptorSet, e.g. from `buf build -o set.json`
    pub descriptor: PathBuf,

    /// Proto file to convert (repeatable). Defaults to every file no other file imports
    #[arg(long = "file", short = 'f')]
    pub files: Vec<String>,

    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Plugin style options, e.g. `allow-get,override-connect-error-detail`
    #[arg(long)]
    pub param: Option<String>,

    /// Output format: json or yaml
    #[arg(long)]
    pub format: Option<String>,

    /// Write one document per file under this directory instead of stdout
    #[arg(long, short = 'o')]
    pub out_dir: Option<PathBuf>,

    /// Treat NO_SIDE_EFFECTS methods as reachable over GET
    #[arg(long)]
    pub allow_get: bool,

    /// Describe error details with the google.rpc schemas
    #[arg(long)]
    pub override_error_detail: bool,
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let set = DescriptorSet::from_json_file(&args.descriptor)
        .with_context(|| format!("failed to read descriptor set {}", args.descriptor.display()))?;

    let files = if args.files.is_empty() {
        root_files(&set)
    } else {
        args.files.clone()
    };
    if files.is_empty() {
        bail!("descriptor set {} contains no files", args.descriptor.display());
    }
    debug!(?files, "files selected for generation");

    let converter = Converter::new(config);
    for file in &files {
        let spec = converter
            .generate_document(&set, file)
            .with_context(|| format!("failed to convert {}", file))?;
        let config = converter.config();

        match &args.out_dir {
            Some(dir) => {
                let path = output_path(dir, file, config.format);
                create_parent(&path)?;
                OpenApiExporter::save_to_file(&spec, &path, config.format, config.pretty_print)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                info!(
                    file = %file,
                    components = spec.components.schemas.len(),
                    path = %path.display(),
                    "document written"
                );
                println!("✅ {} -> {}", file, path.display());
            }
            None => {
                let content = OpenApiExporter::render(&spec, config.format, config.pretty_print)?;
                if files.len() > 1 && config.format == OutputFormat::Yaml {
                    println!("---");
                }
                println!("{}", content.trim_end());
            }
        }
    }
    Ok(())
}

/// Config file first, then `--param`, then individual flags
fn load_config(args: &GenerateArgs) -> anyhow::Result<ConverterConfig> {
    let mut config = match &args.config {
        Some(path) => ConverterConfig::from_toml_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ConverterConfig::default(),
    };
    if let Some(param) = &args.param {
        config.apply_parameter(param)?;
    }
    if let Some(format) = &args.format {
        config.format = format.parse()?;
    }
    if args.allow_get {
        config.allow_get = true;
    }
    if args.override_error_detail {
        config.override_connect_error_detail = true;
    }
    Ok(config)
}

/// Files of the set that no other file in the set imports
fn root_files(set: &DescriptorSet) -> Vec<String> {
    let imported: HashSet<&str> = set
        .files
        .iter()
        .flat_map(|f| f.dependencies.iter().map(String::as_str))
        .collect();
    set.files
        .iter()
        .map(|f| f.name.as_str())
        .filter(|name| !imported.contains(name))
        .map(str::to_string)
        .collect()
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}
