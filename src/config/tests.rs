use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");

        let mut original_config = Config::load(temp_dir.path()).expect("should load defaults");
        original_config.ollama.host = "test-host".to_string();
        original_config.ollama.port = 8080;
        original_config.llm.model = "gemini-2.0-flash".to_string();
        original_config.retrieval.query_expansion = false;
        original_config.save().expect("should save config");

        assert!(temp_dir.path().join("config.toml").exists());

        let loaded_config = Config::load(temp_dir.path()).expect("should reload config");
        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn invalid_toml_handling() {
        let invalid_toml = r#"
            [ollama
            host = "localhost"
            port = "invalid_port"
        "#;

        let result: Result<Config, toml::de::Error> = toml::from_str(invalid_toml);
        assert!(result.is_err());
    }

    #[test]
    fn partial_config_with_defaults() {
        let partial_toml = r#"
            [ollama]
            host = "custom-host"

            [chunking.folder_file]
            size = 800
            overlap = 100
        "#;

        let config: Config = toml::from_str(partial_toml).expect("should fill defaults");
        assert_eq!(config.ollama.host, "custom-host");
        assert_eq!(config.ollama.port, 11434);
        assert_eq!(config.chunking.folder_file.size, 800);
        assert_eq!(config.chunking.folder_file.overlap, 100);
        assert_eq!(config.chunking.document.size, 1500);
        assert_eq!(config.llm.api_version, "v1beta");
    }

    #[test]
    fn invalid_file_is_rejected_on_load() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        fs::write(
            temp_dir.path().join("config.toml"),
            "[chunking.document]\nsize = 100\noverlap = 200\n",
        )
        .expect("should write config");

        assert!(Config::load(temp_dir.path()).is_err());
    }

    #[test]
    fn config_validation_edge_cases() {
        let mut config = Config::default();
        config.ollama.host = String::new();

        assert!(config.validate().is_err());
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidProtocol("ftp".to_string()),
            ConfigError::InvalidPort(0),
            ConfigError::InvalidBatchSize(0),
            ConfigError::InvalidModel(String::new()),
            ConfigError::InvalidUrl("invalid-url".to_string()),
            ConfigError::InvalidRetrievalK(0),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(message.len() > 10);
        }
    }
}
