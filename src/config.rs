//! A minimal typed key-value store, modeled on the original tool's plain
//! text config format: `<type> <key> = <value...>`. Blank lines and `#`
//! comments are skipped. The raw, non-comment lines are retained verbatim
//! so a weights file can echo back the config that produced it.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Bdt,
    Rf,
    Et,
}

impl Method {
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s {
            "BDT" => Ok(Method::Bdt),
            "RF" => Ok(Method::Rf),
            "ET" => Ok(Method::Et),
            other => Err(ConfigError::OutOfRange {
                key: "Method".into(),
                message: format!("unknown method '{other}', expected BDT, RF or ET"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Bdt => "BDT",
            Method::Rf => "RF",
            Method::Et => "ET",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<String, ConfigValue>,
    raw_lines: Vec<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(text: &str) -> Result<Self, ConfigError> {
        let mut config = Config::new();
        for (lineno, raw_line) in text.lines().enumerate() {
            let lineno = lineno + 1;
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            if tokens.len() < 4 || tokens[2] != "=" {
                return Err(ConfigError::Io {
                    path: "<string>".into(),
                    message: format!("line {lineno}: expected '<type> <key> = <value>'"),
                });
            }
            let ty = tokens[0];
            let key = tokens[1].to_string();
            let rest = &tokens[3..];
            let value = match ty {
                "bool" => ConfigValue::Bool(parse_bool(rest[0], lineno)?),
                "int" => ConfigValue::Int(rest[0].parse().map_err(|_| ConfigError::OutOfRange {
                    key: key.clone(),
                    message: format!("line {lineno}: not an int"),
                })?),
                "float" | "double" => {
                    ConfigValue::Float(rest[0].parse().map_err(|_| ConfigError::OutOfRange {
                        key: key.clone(),
                        message: format!("line {lineno}: not a float"),
                    })?)
                }
                "string" => ConfigValue::Str(rest.join(" ")),
                "vector<string>" => ConfigValue::List(rest.iter().map(|s| s.to_string()).collect()),
                other => {
                    return Err(ConfigError::OutOfRange {
                        key,
                        message: format!(
                            "line {lineno}: unknown type token '{other}', expected bool|int|float|double|string|vector<string>"
                        ),
                    })
                }
            };
            config.raw_lines.push(raw_line.to_string());
            config.values.insert(key, value);
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_str(&text)
    }

    pub fn raw_lines(&self) -> &[String] {
        &self.raw_lines
    }

    pub fn put_bool(&mut self, key: impl Into<String>, value: bool) -> &mut Self {
        self.values.insert(key.into(), ConfigValue::Bool(value));
        self
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i64) -> &mut Self {
        self.values.insert(key.into(), ConfigValue::Int(value));
        self
    }

    pub fn put_float(&mut self, key: impl Into<String>, value: f64) -> &mut Self {
        self.values.insert(key.into(), ConfigValue::Float(value));
        self
    }

    pub fn put_str(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), ConfigValue::Str(value.into()));
        self
    }

    fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Str(s)) => Ok(s.as_str()),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "string",
            }),
            None => Err(ConfigError::MissingKey(key.into())),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Int(i)) => Ok(*i),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "int",
            }),
            None => Err(ConfigError::MissingKey(key.into())),
        }
    }

    pub fn get_float(&self, key: &str) -> Result<f64, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Float(f)) => Ok(*f),
            Some(ConfigValue::Int(i)) => Ok(*i as f64),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "float",
            }),
            None => Err(ConfigError::MissingKey(key.into())),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get(key) {
            Some(ConfigValue::Bool(b)) => Ok(*b),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "bool",
            }),
            None => Err(ConfigError::MissingKey(key.into())),
        }
    }

    pub fn get_bool_if(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn get_list(&self, key: &str) -> Result<&[String], ConfigError> {
        match self.get(key) {
            Some(ConfigValue::List(l)) => Ok(l.as_slice()),
            Some(_) => Err(ConfigError::WrongType {
                key: key.into(),
                expected: "vector<string>",
            }),
            None => Err(ConfigError::MissingKey(key.into())),
        }
    }
}

fn parse_bool(token: &str, lineno: usize) -> Result<bool, ConfigError> {
    match token {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::OutOfRange {
            key: "<bool>".into(),
            message: format!("line {lineno}: '{other}' is not a bool"),
        }),
    }
}
