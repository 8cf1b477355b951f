use std::fs;
use std::path::PathBuf;

use config::{Config, ConfigError, File, FileFormat};
use serde::de::DeserializeOwned;

/// Loads a deserializable configuration struct from a yaml/yml/json/toml/
/// ron file, resolving `$VAR`-style environment variable references in
/// the raw file text before parsing.
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn load<T: DeserializeOwned>(file_path: PathBuf) -> Result<T, ConfigError> {
        let Some(ext) = file_path.extension() else {
            return Err(ConfigError::NotFound(format!(
                "Could not find file extension on path {file_path:?}"
            )));
        };

        let file_format = match ext.to_str() {
            Some("yaml") | Some("yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            Some("toml") => FileFormat::Toml,
            Some("ron") => FileFormat::Ron,
            _ => {
                return Err(ConfigError::NotFound(format!(
                    "File format not supported. File needs to end with .yaml, .json, .toml or .ron. {file_path:?}"
                )))
            }
        };

        let config_str = fs::read_to_string(&file_path)
            .map_err(|e| ConfigError::Foreign(Box::new(e)))?;
        let expanded = shellexpand::env(&config_str)
            .map_err(|e| ConfigError::Message(e.to_string()))?;

        let built = Config::builder()
            .add_source(File::from_str(&expanded, file_format))
            .build()?;

        built.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PhenoscoringConfig;
    use std::fs::File as StdFile;
    use std::io::Write;
    use tempfile::TempDir;

    fn temp_dir() -> TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }

    const YAML_DATA: &[u8] = br#"
db: "phenoscoring.redb"
obo: "hp.obo"
phenotype_frequencies: "prep-priors.tsv"
"#;

    #[test]
    fn loads_minimal_yaml_config_with_defaults() {
        let dir = temp_dir();
        let path = dir.path().join("config.yaml");
        let mut file = StdFile::create(&path).unwrap();
        file.write_all(YAML_DATA).unwrap();

        let config: PhenoscoringConfig = ConfigLoader::load(path).unwrap();
        assert_eq!(config.db, "phenoscoring.redb");
        assert_eq!(config.reference_neighbors_k, 5);
        assert!((config.fp_penalty - 0.8).abs() < 1e-9);
    }

    #[test]
    fn rejects_unsupported_extension() {
        let path = PathBuf::from("config.exe");
        let result: Result<PhenoscoringConfig, _> = ConfigLoader::load(path);
        assert!(result.is_err());
    }
}
