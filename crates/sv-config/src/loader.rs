//! YAML loading with `!include`, `!secret` and `!env_var`

use crate::error::{ConfigError, ConfigResult};
use serde_yaml::value::TaggedValue;
use serde_yaml::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Secrets file name, looked up next to configuration.yaml
pub const SECRETS_FILE: &str = "secrets.yaml";

/// Resolves tags while walking one configuration document
struct YamlLoader {
    config_dir: PathBuf,
    /// Contents of secrets.yaml, read on the first `!secret`
    secrets: Option<HashMap<String, String>>,
    /// Files currently being loaded, to detect include cycles
    include_stack: HashSet<PathBuf>,
}

impl YamlLoader {
    fn new(config_dir: PathBuf) -> Self {
        Self {
            config_dir,
            secrets: None,
            include_stack: HashSet::new(),
        }
    }

    fn load_file(&mut self, path: &Path) -> ConfigResult<Value> {
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        };
        debug!("Loading YAML file: {:?}", path);

        if !self.include_stack.insert(path.clone()) {
            return Err(ConfigError::Tag {
                tag: "!include",
                argument: path.display().to_string(),
                reason: "file includes itself".to_string(),
            });
        }

        let result = read_yaml(&path).and_then(|value| self.resolve(value, &path));
        self.include_stack.remove(&path);
        result
    }

    fn resolve(&mut self, value: Value, source_path: &Path) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged, source_path),
            Value::Mapping(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, self.resolve(v, source_path)?)))
                .collect::<ConfigResult<serde_yaml::Mapping>>()
                .map(Value::Mapping),
            Value::Sequence(seq) => seq
                .into_iter()
                .map(|v| self.resolve(v, source_path))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            _ => Ok(value),
        }
    }

    fn resolve_tag(&mut self, tagged: TaggedValue, source_path: &Path) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!("Resolving tag '{}' with value {:?}", tag, tagged.value);

        match tag.as_str() {
            "!include" => {
                let relative = tag_argument("!include", &tagged.value)?;
                // Relative to the including file, not the config dir
                let base_dir = source_path.parent().unwrap_or(&self.config_dir);
                let path = base_dir.join(relative);
                self.load_file(&path)
            }
            "!secret" => {
                let key = tag_argument("!secret", &tagged.value)?;
                let secret = self.secret(key)?;
                debug!("Substituted secret: {}", key);
                Ok(Value::String(secret))
            }
            "!env_var" => {
                let var = tag_argument("!env_var", &tagged.value)?;
                let value = std::env::var(var).map_err(|e| ConfigError::Tag {
                    tag: "!env_var",
                    argument: var.to_string(),
                    reason: e.to_string(),
                })?;
                debug!("Substituted env var: {}", var);
                Ok(Value::String(value))
            }
            _ => {
                // Unknown tags are kept so the schema step can report them in context
                let value = self.resolve(tagged.value, source_path)?;
                Ok(Value::Tagged(Box::new(TaggedValue {
                    tag: tagged.tag,
                    value,
                })))
            }
        }
    }

    fn secret(&mut self, key: &str) -> ConfigResult<String> {
        if self.secrets.is_none() {
            self.secrets = Some(read_secrets(&self.config_dir.join(SECRETS_FILE))?);
        }
        self.secrets
            .as_ref()
            .and_then(|secrets| secrets.get(key))
            .cloned()
            .ok_or_else(|| ConfigError::Tag {
                tag: "!secret",
                argument: key.to_string(),
                reason: format!("no such key in {}", SECRETS_FILE),
            })
    }
}

fn read_yaml(path: &Path) -> ConfigResult<Value> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

/// Scalar secrets in their string form; a missing file has no secrets
fn read_secrets(path: &Path) -> ConfigResult<HashMap<String, String>> {
    if !path.exists() {
        debug!("No secrets file at {:?}", path);
        return Ok(HashMap::new());
    }

    let Value::Mapping(map) = read_yaml(path)? else {
        return Ok(HashMap::new());
    };
    let secrets = map
        .into_iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                _ => return None,
            };
            Some((key.as_str()?.to_string(), value))
        })
        .collect::<HashMap<_, _>>();

    debug!("Loaded {} secrets from {:?}", secrets.len(), path);
    Ok(secrets)
}

fn tag_argument<'a>(tag: &'static str, value: &'a Value) -> ConfigResult<&'a str> {
    value.as_str().ok_or_else(|| ConfigError::Tag {
        tag,
        argument: format!("{:?}", value),
        reason: "argument must be a string".to_string(),
    })
}

/// Load `file` from `config_dir` with every tag resolved
pub fn load_yaml(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    YamlLoader::new(config_dir.into()).load_file(file.as_ref())
}
