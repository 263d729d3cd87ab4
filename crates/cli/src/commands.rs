//! Subcommands of `stackctl`.

use anyhow::{Context, Result};
use channel::ChannelFactory;
use clap::Subcommand;
use corelib::{
    Error, ModuleRegistry, SharedChannel, SiteChannelProvider, StackAssembler, StackConfiguration,
    StackDescriptor, TracingSink,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Output of a command, printed to stdout.
pub type CommandResult = Result<String>;

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the resolved protocol stack, transport first
    Show {
        /// Stack descriptor (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Create a channel and print its modules and address
    Create {
        /// Stack descriptor (JSON)
        #[arg(short, long)]
        config: PathBuf,
        /// Identifier of the requesting service
        #[arg(long, default_value = "stackctl")]
        id: String,
    },
}

impl Command {
    pub fn execute(&self) -> CommandResult {
        match self {
            Command::Show { config } => show(config),
            Command::Create { config, id } => create(config, id),
        }
    }
}

/// Remote sites are other processes; a standalone tool cannot reach them.
fn unreachable_sites() -> Arc<dyn SiteChannelProvider> {
    Arc::new(|site: &str| -> corelib::Result<SharedChannel> {
        Err(Error::SiteChannel {
            site: site.to_string(),
            reason: "remote site channels are not available to stackctl".to_string(),
        })
    })
}

fn load(path: &Path) -> Result<(Arc<ModuleRegistry>, StackConfiguration)> {
    let descriptor = StackDescriptor::load(path)
        .with_context(|| format!("failed to load stack descriptor {}", path.display()))?;

    let mut registry = ModuleRegistry::new();
    for schema in descriptor.schemas() {
        registry.register(schema);
    }
    let configuration = descriptor
        .build(&registry, Some(unreachable_sites()))
        .with_context(|| format!("invalid stack {}", descriptor.name))?;

    info!(
        stack = %configuration.name(),
        modules = descriptor.modules.len(),
        "loaded stack descriptor"
    );
    Ok((Arc::new(registry), configuration))
}

fn show(path: &Path) -> CommandResult {
    let (_, configuration) = load(path)?;
    let resolved = StackAssembler::new(&configuration, &TracingSink).assemble();

    let mut out = String::new();
    writeln!(out, "stack {}", configuration.name())?;
    for (position, protocol) in resolved.iter().enumerate() {
        write!(out, "{position:>3}  {}", protocol.name())?;
        for (name, value) in protocol.properties() {
            write!(out, " {name}={value}")?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

fn create(path: &Path, id: &str) -> CommandResult {
    let (registry, configuration) = load(path)?;
    let factory = ChannelFactory::new(Arc::new(configuration), registry);
    let channel = factory
        .create_channel(id)
        .with_context(|| format!("failed to create channel for {id}"))?;

    let mut out = String::new();
    writeln!(out, "channel {}", channel.name().unwrap_or("-"))?;
    writeln!(out, "address {}", channel.generate_address())?;
    writeln!(out, "stack {}", channel.protocol_stack().protocol_names().join(" <- "))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STACK: &str = r#"{
        "name": "tcp",
        "node_name": "node1",
        "modules": [
            { "name": "TCP", "transport": true },
            { "name": "MPING", "properties": ["bind_addr"] }
        ],
        "socket_bindings": { "jgroups-tcp": { "address": "127.0.0.1", "port": 7600 } },
        "transport": { "type": "TCP", "socket_binding": "jgroups-tcp",
                       "topology": { "site": "s1" } },
        "protocols": [ { "type": "MPING" } ],
        "relay": { "site": "LON", "remote_sites": [ { "name": "NYC", "cluster": "global" } ] }
    }"#;

    fn descriptor_file(name: &str) -> PathBuf {
        let file = format!("stackctl-{}-{name}.json", std::process::id());
        let path = std::env::temp_dir().join(file);
        std::fs::write(&path, STACK).unwrap();
        path
    }

    #[test]
    fn test_show_prints_transport_first() {
        let path = descriptor_file("show");
        let out = Command::Show { config: path.clone() }.execute().unwrap();
        std::fs::remove_file(path).ok();

        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "stack tcp");
        assert!(lines[1].contains("TCP"));
        assert!(lines[1].contains("bind_port=7600"));
        assert!(lines[2].contains("MPING bind_addr=127.0.0.1"));
    }

    #[test]
    fn test_create_prints_stack() {
        let path = descriptor_file("create");
        let out = Command::Create {
            config: path.clone(),
            id: "web".to_string(),
        }
        .execute()
        .unwrap();
        std::fs::remove_file(path).ok();

        assert!(out.contains("channel node1"));
        assert!(out.contains("@s1/-/-"));
        assert!(out.contains("TCP <- MPING <- RELAY2 <- FORK"));
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = Command::Show {
            config: PathBuf::from("/nonexistent/stack.json"),
        }
        .execute()
        .unwrap_err();
        assert!(err.to_string().contains("failed to load stack descriptor"));
    }
}
