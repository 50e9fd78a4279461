use crate::config::Config;
use crate::topology::{Flow, TopologyDescriptor};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::info;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;
    let config: Config = serde_yaml::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse configuration '{}'", config_path.display()))?;

    config.validate()?;
    info!("Routing method: {}", config.routing);

    Ok(config)
}

/// Resolve a path from the configuration against the configuration file's directory
pub fn resolve_relative(config_path: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        return path.to_path_buf();
    }
    config_path.parent().unwrap_or_else(|| Path::new(".")).join(path)
}

/// Load node/link descriptors from a JSON or YAML file
pub fn load_topology_descriptor(path: &Path, bidirectional: bool) -> Result<TopologyDescriptor> {
    let descriptor: TopologyDescriptor = read_structured(path)?;
    info!(
        "Loaded {} nodes and {} links from {:?}",
        descriptor.nodes.len(),
        descriptor.links.len(),
        path
    );
    Ok(if bidirectional {
        descriptor.with_reverse_links()
    } else {
        descriptor
    })
}

/// Load a list of flow records from a JSON or YAML file
pub fn load_flows(path: &Path) -> Result<Vec<Flow>> {
    let flows: Vec<Flow> = read_structured(path)?;
    info!("Loaded {} flows from {:?}", flows.len(), path);
    Ok(flows)
}

/// JSON for `.json` files, YAML for anything else
fn read_structured<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).wrap_err_with(|| format!("Failed to open '{}'", path.display()))?;
    let is_json = path.extension().map_or(false, |ext| ext == "json");
    if is_json {
        serde_json::from_reader(file).wrap_err_with(|| format!("Failed to parse JSON '{}'", path.display()))
    } else {
        serde_yaml::from_reader(file).wrap_err_with(|| format!("Failed to parse YAML '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    #[test]
    fn test_load_config() {
        let yaml = r#"
general:
  name: ring
topology:
  path: ring.json
routing:
  method: EAR
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.general.name, "ring");
        assert_eq!(config.routing.to_string(), "EAR");
    }

    #[test]
    fn test_invalid_config_rejected() {
        let yaml = r#"
general:
  name: ""
topology:
  path: ring.json
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_load_json_descriptor() {
        let json = r#"{
  "nodes": [{"id": "A"}, {"id": "B", "pop": {"city": "Lisbon"}}],
  "links": [{"node1": "A", "node2": "B", "bw": "100 Mbps", "delay": "2.5 ms"}]
}"#;
        let mut temp_file = Builder::new().suffix(".json").tempfile().unwrap();
        write!(temp_file, "{}", json).unwrap();

        let descriptor = load_topology_descriptor(temp_file.path(), true).unwrap();
        assert_eq!(descriptor.nodes.len(), 2);
        assert_eq!(descriptor.links.len(), 2);
        assert_eq!(descriptor.links[0].bw, 100.0);
        assert_eq!(descriptor.links[1].node1, "B");
        assert_eq!(descriptor.links[1].delay, 2.5);

        let one_way = load_topology_descriptor(temp_file.path(), false).unwrap();
        assert_eq!(one_way.links.len(), 1);
    }

    #[test]
    fn test_load_yaml_flows() {
        let yaml = r#"
- { id: f1, node1: A, node2: B, bandwidth: 2 }
- { id: f2, src: B, dst: A, bw: 3, class: assured }
"#;
        let mut temp_file = Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let flows = load_flows(temp_file.path()).unwrap();
        assert_eq!(flows.len(), 2);
        assert_eq!(flows[1].src, "B");
        assert_eq!(flows[1].bandwidth, 3.0);
    }

    #[test]
    fn test_resolve_relative() {
        let config = Path::new("/runs/ring/config.yaml");
        assert_eq!(resolve_relative(config, "ring.json"), PathBuf::from("/runs/ring/ring.json"));
        assert_eq!(resolve_relative(config, "/data/ring.json"), PathBuf::from("/data/ring.json"));
    }
}
