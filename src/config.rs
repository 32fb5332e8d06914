use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::schema::{GitHubHandle, SshPublicKey, SudoRule, deserialize_github};

// ============================================================================
// Document format
// ============================================================================

/// Serialization format of a configuration document, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    /// `.json` and `.toml` are recognised; anything else is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Yaml => "YAML",
            Self::Json => "JSON",
            Self::Toml => "TOML",
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Everything one provisioning run applies, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(rename = "instance-id")]
    pub instance_id: String,
    pub hostname: String,
    pub users: Vec<User>,
    pub files: Vec<File>,
    pub runcmd: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub home: String,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sudo: Vec<SudoRule>,
    #[serde(default)]
    pub shell: String,
    #[serde(
        rename = "ssh-authorized-keys",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub authorized_keys: Vec<SshPublicKey>,
    #[serde(
        default,
        deserialize_with = "deserialize_github",
        skip_serializing_if = "Option::is_none"
    )]
    pub github: Option<GitHubHandle>,
}

impl User {
    /// Declared home, or `/home/<name>` when empty
    pub fn home_dir(&self) -> PathBuf {
        if self.home.is_empty() {
            paths::default_home(&self.name)
        } else {
            PathBuf::from(&self.home)
        }
    }

    /// Declared shell, or `/bin/sh` when empty
    pub fn login_shell(&self) -> &str {
        if self.shell.is_empty() {
            paths::DEFAULT_SHELL
        } else {
            &self.shell
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub path: PathBuf,
    pub permissions: String,
    pub contents: String,
    pub owner: String,
    pub group: String,
}

impl Config {
    /// Read, parse and validate a configuration document
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let format = ConfigFormat::from_path(path);

        Self::parse(&content, format)
            .with_context(|| format!("Invalid {} in {}", format.name(), path.display()))
    }

    /// Parse and validate a document already in memory
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: Self = match format {
            ConfigFormat::Yaml => {
                // An empty YAML document is null, not an empty mapping
                if content.trim().is_empty() {
                    Self::default()
                } else {
                    serde_yaml::from_str(content)?
                }
            }
            ConfigFormat::Json => serde_json::from_str(content)?,
            ConfigFormat::Toml => toml::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check what deserialization alone cannot
    pub fn validate(&self) -> Result<()> {
        paths::check_instance_id(&self.instance_id)?;

        for (i, user) in self.users.iter().enumerate() {
            check_user_name(&user.name).with_context(|| format!("users[{i}]"))?;
        }
        for (i, file) in self.files.iter().enumerate() {
            if file.path.as_os_str().is_empty() {
                bail!("files[{i}]: path is empty");
            }
            if !file.path.is_absolute() {
                bail!("files[{i}]: path {} is not absolute", file.path.display());
            }
        }
        Ok(())
    }
}

fn check_user_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("user name is empty");
    }
    if name.starts_with('-') || name.contains(|c: char| c.is_whitespace() || c == ':' || c == '/')
    {
        bail!("user name {name:?} is not a valid account name");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
instance-id: i-0abc123
hostname: web-01
users:
  - name: alice
    groups: [docker, wheel]
    sudo: ["ALL=(ALL) NOPASSWD:ALL"]
    ssh-authorized-keys:
      - ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIGb3mzGx0Rk1hWdLP9bC5xZ2l6XW7qkIY7xO6c4mKx9q alice@laptop
    github: alice
  - name: bob
    home: /srv/bob
    shell: /bin/bash
files:
  - path: /etc/motd
    permissions: "0644"
    contents: "welcome\n"
    owner: root
    group: root
runcmd:
  - echo hello
  - systemctl restart sshd
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::parse(SAMPLE, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.instance_id, "i-0abc123");
        assert_eq!(config.hostname, "web-01");
        assert_eq!(config.users.len(), 2);
        assert_eq!(config.files.len(), 1);
        assert_eq!(config.runcmd, vec!["echo hello", "systemctl restart sshd"]);

        let alice = &config.users[0];
        assert_eq!(alice.groups, vec!["docker", "wheel"]);
        assert_eq!(alice.sudo[0].as_str(), "ALL=(ALL) NOPASSWD:ALL");
        assert_eq!(alice.authorized_keys[0].algorithm(), "ssh-ed25519");
        assert_eq!(alice.github.as_ref().map(GitHubHandle::as_str), Some("alice"));

        assert_eq!(config.files[0].contents, "welcome\n");
    }

    #[test]
    fn test_user_defaults() {
        let config = Config::parse(SAMPLE, ConfigFormat::Yaml).unwrap();
        let alice = &config.users[0];
        assert_eq!(alice.home_dir(), PathBuf::from("/home/alice"));
        assert_eq!(alice.login_shell(), "/bin/sh");

        let bob = &config.users[1];
        assert_eq!(bob.home_dir(), PathBuf::from("/srv/bob"));
        assert_eq!(bob.login_shell(), "/bin/bash");
        assert!(bob.github.is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let file = File {
            path: PathBuf::from("/foo/bar"),
            permissions: "0777".to_string(),
            contents: "hi".to_string(),
            owner: "root".to_string(),
            group: "root".to_string(),
        };

        let yaml = serde_yaml::to_string(&file).unwrap();
        let back: File = serde_yaml::from_str(&yaml).unwrap();

        assert_eq!(back.path, PathBuf::from("/foo/bar"));
        assert_eq!(back.permissions, "0777");
        assert_eq!(back.contents, "hi");
    }

    #[test]
    fn test_config_round_trip() {
        let config = Config::parse(SAMPLE, ConfigFormat::Yaml).unwrap();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back = Config::parse(&yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_unknown_keys_ignored_and_missing_keys_default() {
        let doc = "instance-id: i-1\nbootcmd: [reboot]\nusers:\n  - name: carol\n    lock_passwd: true\n";
        let config = Config::parse(doc, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.hostname, "");
        assert!(config.files.is_empty());
        assert!(config.runcmd.is_empty());
        assert_eq!(config.users[0].name, "carol");
        assert!(config.users[0].groups.is_empty());
    }

    #[test]
    fn test_empty_github_is_none() {
        let doc = "instance-id: i-1\nusers:\n  - name: dave\n    github: \"\"\n";
        let config = Config::parse(doc, ConfigFormat::Yaml).unwrap();
        assert!(config.users[0].github.is_none());
    }

    #[test]
    fn test_invalid_typed_fields_rejected() {
        let bad_key = "instance-id: i-1\nusers:\n  - name: eve\n    ssh-authorized-keys: [\"nope\"]\n";
        assert!(Config::parse(bad_key, ConfigFormat::Yaml).is_err());

        let bad_handle = "instance-id: i-1\nusers:\n  - name: eve\n    github: \"-eve-\"\n";
        assert!(Config::parse(bad_handle, ConfigFormat::Yaml).is_err());

        let bad_sudo = "instance-id: i-1\nusers:\n  - name: eve\n    sudo: [\"  \"]\n";
        assert!(Config::parse(bad_sudo, ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn test_user_name_required() {
        let doc = "instance-id: i-1\nusers:\n  - home: /home/nobody\n";
        assert!(Config::parse(doc, ConfigFormat::Yaml).is_err());

        let doc = "instance-id: i-1\nusers:\n  - name: \"\"\n";
        assert!(Config::parse(doc, ConfigFormat::Yaml).is_err());

        let doc = "instance-id: i-1\nusers:\n  - name: \"-rf\"\n";
        assert!(Config::parse(doc, ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn test_file_path_must_be_absolute() {
        let doc = "instance-id: i-1\nfiles:\n  - path: etc/motd\n    permissions: \"0644\"\n";
        let err = Config::parse(doc, ConfigFormat::Yaml).unwrap_err();
        assert_eq!(err.to_string(), "files[0]: path etc/motd is not absolute");

        let doc = "instance-id: i-1\nfiles:\n  - path: \"\"\n";
        let err = Config::parse(doc, ConfigFormat::Yaml).unwrap_err();
        assert_eq!(err.to_string(), "files[0]: path is empty");
    }

    #[test]
    fn test_instance_id_validated() {
        assert!(Config::parse("hostname: x\n", ConfigFormat::Yaml).is_err());
        assert!(Config::parse("instance-id: ../x\n", ConfigFormat::Yaml).is_err());
        assert!(Config::parse("", ConfigFormat::Yaml).is_err());
    }

    #[test]
    fn test_json_and_toml() {
        let json = r#"{"instance-id": "i-2", "hostname": "db", "runcmd": ["true"]}"#;
        let config = Config::parse(json, ConfigFormat::Json).unwrap();
        assert_eq!(config.hostname, "db");
        assert_eq!(config.runcmd, vec!["true"]);

        let toml = "instance-id = \"i-3\"\nhostname = \"cache\"\n\n[[files]]\npath = \"/etc/x\"\npermissions = \"600\"\ncontents = \"x\"\nowner = \"root\"\ngroup = \"root\"\n";
        let config = Config::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.files[0].path, PathBuf::from("/etc/x"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.json")), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_path(Path::new("a.TOML")), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.yml")), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("user-data")), ConfigFormat::Yaml);
    }

    #[test]
    fn test_load_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.yaml"));

        fs::write(&path, "instance-id: [unclosed\n").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid YAML"));

        fs::write(&path, SAMPLE).unwrap();
        assert_eq!(Config::load(&path).unwrap().hostname, "web-01");
    }
}
