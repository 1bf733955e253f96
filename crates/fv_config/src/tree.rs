// crates/fv_config/src/tree.rs

//! 分节配置树
//!
//! 以 "节/子节/键" 的方式对 JSON 配置做类型化查询：
//!
//! ```text
//! tree.section("grid")?.subsection("interpolation")?.get_str("method")?
//! ```
//!
//! `SolverConfig` 的加载也经过这里，保证两种访问方式看到同一份数据。

use serde_json::Value;
use std::path::Path;

use crate::error::ConfigError;

/// 配置树（JSON 文档根）
#[derive(Debug, Clone)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    /// 从文件读取
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// 从字符串解析
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let root: Value =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        if !root.is_object() {
            return Err(ConfigError::Parse("配置文件顶层必须是对象".to_string()));
        }
        Ok(Self { root })
    }

    /// 根节点
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// 获取顶层节
    pub fn section(&self, name: &str) -> Result<ConfigSection<'_>, ConfigError> {
        match self.root.get(name) {
            Some(value) if value.is_object() => Ok(ConfigSection {
                path: name.to_string(),
                value,
            }),
            Some(_) => Err(ConfigError::TypeMismatch {
                key: name.to_string(),
                expected: "section",
            }),
            None => Err(ConfigError::Missing(name.to_string())),
        }
    }
}

/// 配置节视图
#[derive(Debug, Clone)]
pub struct ConfigSection<'a> {
    path: String,
    value: &'a Value,
}

impl<'a> ConfigSection<'a> {
    /// 节路径（点分隔）
    pub fn path(&self) -> &str {
        &self.path
    }

    /// 获取子节
    pub fn subsection(&self, name: &str) -> Result<ConfigSection<'a>, ConfigError> {
        let key = self.key(name);
        match self.value.get(name) {
            Some(value) if value.is_object() => Ok(ConfigSection { path: key, value }),
            Some(_) => Err(ConfigError::TypeMismatch {
                key,
                expected: "section",
            }),
            None => Err(ConfigError::Missing(key)),
        }
    }

    /// 字符串值
    pub fn get_str(&self, name: &str) -> Result<&'a str, ConfigError> {
        self.lookup(name)?.as_str().ok_or(ConfigError::TypeMismatch {
            key: self.key(name),
            expected: "string",
        })
    }

    /// 整数值
    pub fn get_int(&self, name: &str) -> Result<i64, ConfigError> {
        self.lookup(name)?.as_i64().ok_or(ConfigError::TypeMismatch {
            key: self.key(name),
            expected: "integer",
        })
    }

    /// 浮点值（整数字面量也接受）
    pub fn get_double(&self, name: &str) -> Result<f64, ConfigError> {
        self.lookup(name)?.as_f64().ok_or(ConfigError::TypeMismatch {
            key: self.key(name),
            expected: "floating-point",
        })
    }

    fn lookup(&self, name: &str) -> Result<&'a Value, ConfigError> {
        self.value
            .get(name)
            .ok_or_else(|| ConfigError::Missing(self.key(name)))
    }

    fn key(&self, name: &str) -> String {
        format!("{}.{}", self.path, name)
    }
}
