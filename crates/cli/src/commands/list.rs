use anyhow::Context;
use clap::Args;
use connect_openapi::DescriptorSet;
use serde_json::json;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// JSON encoded FileDescriptorSet
    pub descriptor: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ListArgs) -> anyhow::Result<()> {
    let set = DescriptorSet::from_json_file(&args.descriptor)
        .with_context(|| format!("failed to read descriptor set {}", args.descriptor.display()))?;

    if args.json {
        let files: Vec<_> = set
            .files
            .iter()
            .map(|f| {
                json!({
                    "name": f.name,
                    "package": f.package,
                    "messages": f.messages.iter().map(|m| &m.full_name).collect::<Vec<_>>(),
                    "enums": f.enums.iter().map(|e| &e.full_name).collect::<Vec<_>>(),
                    "services": f.services.iter().map(|s| &s.full_name).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    for file in &set.files {
        println!("{} ({})", file.name, file.package);
        for message in &file.messages {
            println!("  message {}", message.full_name);
        }
        for en in &file.enums {
            println!("  enum    {}", en.full_name);
        }
        for service in &file.services {
            println!("  service {} ({} methods)", service.full_name, service.methods.len());
            for method in &service.methods {
                match &method.http_get {
                    Some(path) => println!("    rpc {} [GET {}]", method.name, path),
                    None => println!("    rpc {}", method.name),
                }
            }
        }
    }
    Ok(())
}
