use indexmap::IndexMap;
use serde::Serialize;
use std::borrow::Cow;

/// 占位符取值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Number(f64),
    Bool(bool),
    /// 仅用于 `{#name}` 循环
    List(Vec<PlaceholderBag>),
}

impl Value {
    /// 区块 `{#name}` 是否输出
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Text(text) => !text.is_empty(),
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
            Value::List(items) => !items.is_empty(),
        }
    }

    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(text) => Cow::Borrowed(text.as_str()),
            Value::Number(n) => Cow::Owned(n.to_string()),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::List(_) => Cow::Borrowed(""),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<Vec<PlaceholderBag>> for Value {
    fn from(value: Vec<PlaceholderBag>) -> Self {
        Value::List(value)
    }
}

/// 交给渲染器的扁平键值表, 保持插入顺序
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PlaceholderBag(IndexMap<String, Value>);

impl PlaceholderBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或覆盖
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// 文本或数字取值
    pub fn text(&self, key: &str) -> Option<Cow<'_, str>> {
        match self.0.get(key)? {
            Value::List(_) => None,
            value => Some(value.to_text()),
        }
    }

    pub fn list(&self, key: &str) -> Option<&[PlaceholderBag]> {
        match self.0.get(key)? {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
