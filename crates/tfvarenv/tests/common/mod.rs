use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    pub fn registry_path(&self) -> PathBuf {
        self.root.path().join(".tfvarenv.json")
    }

    /// Writes a registry containing one environment per name.
    #[allow(dead_code)]
    pub fn write_registry(&self, names: &[&str]) {
        let environments: serde_json::Map<String, serde_json::Value> = names
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    serde_json::json!({
                        "name": name,
                        "s3": {
                            "bucket": "tfvars-bucket",
                            "prefix": format!("app/{}", name),
                            "tfvars_key": "terraform.tfvars"
                        },
                        "aws": { "region": "ap-northeast-1" }
                    }),
                )
            })
            .collect();

        let registry = serde_json::json!({
            "version": "1.0",
            "default_region": "ap-northeast-1",
            "environments": environments,
        });
        fs::write(
            self.registry_path(),
            serde_json::to_string_pretty(&registry).unwrap(),
        )
        .unwrap();
    }
}
