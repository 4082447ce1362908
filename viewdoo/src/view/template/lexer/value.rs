//! The basic building block of the template language: the value.
//! Integers, floats, strings, lists, hashes, functions, etc.
//! are all represented using the value.
//!
//! This allows operations across data types, like multiplying lists by integers,
//! or accessing hash keys.
use super::super::language::Function;
use super::super::Error;
use crate::view::state::Scope;

use std::cmp::Ordering;
use std::collections::HashMap;

/// A value, e.g. `5` or `"hello world"`.
#[derive(Debug, Clone)]
pub enum Value {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    List(Vec<Value>),
    Hash(HashMap<String, Value>),
    Function(Function),
    Null,
    /// Receiver of global functions, e.g. `default(name, "guest")`.
    Interpreter,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(i1), Value::Integer(i2)) => i1 == i2,
            (Value::Integer(i1), Value::Float(f2)) => (*i1 as f64) == *f2,
            (Value::Float(f1), Value::Integer(i2)) => *f1 == (*i2 as f64),
            (Value::Float(f1), Value::Float(f2)) => f1 == f2,
            (Value::String(s1), Value::String(s2)) => s1 == s2,
            (Value::Boolean(b1), Value::Boolean(b2)) => b1 == b2,
            (Value::List(l1), Value::List(l2)) => l1 == l2,
            (Value::Hash(h1), Value::Hash(h2)) => h1 == h2,
            (Value::Function(f1), Value::Function(f2)) => f1 == f2,
            (Value::Null, Value::Null) => true,
            (Value::Interpreter, Value::Interpreter) => true,
            _ => false,
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Value::Integer(i1), Value::Integer(i2)) => i1.partial_cmp(i2),
            (Value::Integer(i1), Value::Float(f2)) => (*i1 as f64).partial_cmp(f2),
            (Value::Float(f1), Value::Integer(i2)) => f1.partial_cmp(&(*i2 as f64)),
            (Value::Float(f1), Value::Float(f2)) => f1.partial_cmp(f2),
            (Value::String(s1), Value::String(s2)) => s1.partial_cmp(s2),
            (Value::Boolean(b1), Value::Boolean(b2)) => b1.partial_cmp(b2),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::String(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    write!(f, "{}", v)?;
                    if i < l.len() - 1 {
                        write!(f, ", ")?;
                    }
                }
                write!(f, "]")
            }
            Value::Hash(_) => write!(f, "{}", serde_json::Value::from(self)),
            Value::Function(_) => write!(f, "function"),
            Value::Null => write!(f, "null"),
            Value::Interpreter => write!(f, "global"),
        }
    }
}

impl Value {
    /// If the value, when evaluated in the context of an `if` tag
    /// would result in the branch being rendered.
    ///
    /// e.g. `{{if 5}}five is true{{/if}}`
    /// would output "five is true" since `5` is truthy.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Null => false,
            Value::List(list) => !list.is_empty(),
            Value::Hash(hash) => !hash.is_empty(),
            Value::Function(_) => true,
            Value::Interpreter => true,
        }
    }

    /// Lists, hashes and functions can be mutated in place by whoever holds them,
    /// so writing one into a scope always counts as a change.
    pub fn is_composite(&self) -> bool {
        matches!(self, Value::List(_) | Value::Hash(_) | Value::Function(_))
    }

    /// Convert the value into the text that's spliced into markup.
    pub fn render(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => render_float(*f),
            Value::Boolean(b) => b.to_string(),
            Value::List(list) => list
                .iter()
                .map(|v| v.render())
                .collect::<Vec<_>>()
                .join(","),
            Value::Hash(_) => serde_json::Value::from(self).to_string(),
            Value::Null | Value::Function(_) | Value::Interpreter => String::new(),
        }
    }

    pub fn add(&self, other: &Self) -> Self {
        match (self, other) {
            (Value::Integer(i1), Value::Integer(i2)) => Value::Integer(i1.wrapping_add(*i2)),
            (Value::Integer(i1), Value::Float(f2)) => Value::Float(*i1 as f64 + f2),
            (Value::Float(f1), Value::Integer(i2)) => Value::Float(f1 + *i2 as f64),
            (Value::Float(f1), Value::Float(f2)) => Value::Float(f1 + f2),
            (Value::String(s1), other) => Value::String(format!("{}{}", s1, other.render())),
            (Value::List(list), other) => {
                let mut list = list.clone();
                list.push(other.clone());
                Value::List(list)
            }
            (value, Value::List(list)) => {
                let mut new = vec![value.clone()];
                new.extend(list.clone());
                Value::List(new)
            }
            (value, Value::String(s2)) => Value::String(format!("{}{}", value.render(), s2)),
            _ => Value::Null,
        }
    }

    pub fn sub(&self, other: &Self) -> Self {
        match (self, other) {
            (Value::Integer(i1), Value::Integer(i2)) => Value::Integer(i1.wrapping_sub(*i2)),
            (Value::Integer(i1), Value::Float(f2)) => Value::Float(*i1 as f64 - f2),
            (Value::Float(f1), Value::Integer(i2)) => Value::Float(f1 - *i2 as f64),
            (Value::Float(f1), Value::Float(f2)) => Value::Float(f1 - f2),
            (Value::String(s1), Value::String(s2)) => Value::String(s1.replace(s2.as_str(), "")),
            (Value::List(list), other) => {
                let mut list = list.clone();
                list.retain(|v| v != other);
                Value::List(list)
            }
            _ => Value::Null,
        }
    }

    pub fn div(&self, other: &Self) -> Result<Self, Error> {
        Ok(match (self, other) {
            (Value::Integer(_), Value::Integer(0)) => {
                return Err(Error::Runtime("division by zero".into()))
            }
            (Value::Integer(i1), Value::Integer(i2)) => {
                if i1 % i2 == 0 {
                    Value::Integer(i1 / i2)
                } else {
                    Value::Float(*i1 as f64 / *i2 as f64)
                }
            }
            (Value::Integer(i1), Value::Float(f2)) => Value::Float(*i1 as f64 / f2),
            (Value::Float(f1), Value::Integer(i2)) => Value::Float(f1 / *i2 as f64),
            (Value::Float(f1), Value::Float(f2)) => Value::Float(f1 / f2),
            _ => Value::Null,
        })
    }

    pub fn rem(&self, other: &Self) -> Result<Self, Error> {
        Ok(match (self, other) {
            (Value::Integer(_), Value::Integer(0)) => {
                return Err(Error::Runtime("division by zero".into()))
            }
            (Value::Integer(i1), Value::Integer(i2)) => Value::Integer(i1 % i2),
            (Value::Integer(i1), Value::Float(f2)) => Value::Float(*i1 as f64 % f2),
            (Value::Float(f1), Value::Integer(i2)) => Value::Float(f1 % *i2 as f64),
            (Value::Float(f1), Value::Float(f2)) => Value::Float(f1 % f2),
            _ => Value::Null,
        })
    }

    pub fn mul(&self, other: &Self) -> Self {
        match (self, other) {
            (Value::Integer(i1), Value::Integer(i2)) => Value::Integer(i1.wrapping_mul(*i2)),
            (Value::Integer(i1), Value::Float(f2)) => Value::Float(*i1 as f64 * f2),
            (Value::Float(f1), Value::Integer(i2)) => Value::Float(f1 * *i2 as f64),
            (Value::Float(f1), Value::Float(f2)) => Value::Float(f1 * f2),
            (Value::String(s1), Value::Integer(i1)) | (Value::Integer(i1), Value::String(s1)) => {
                Value::String(s1.repeat((*i1).max(0) as usize))
            }
            (Value::List(list), Value::Integer(i1)) => {
                let mut new_list = vec![];
                for _ in 0..*i1 {
                    new_list.extend(list.clone());
                }
                Value::List(new_list)
            }
            _ => Value::Null,
        }
    }

    /// Get a hash key or a list index, without falling back to methods.
    pub fn field(&self, name: &str) -> Option<Value> {
        match self {
            Value::Hash(hash) => hash.get(name).cloned(),
            Value::List(list) => name
                .parse::<usize>()
                .ok()
                .map(|index| list.get(index).cloned().unwrap_or(Value::Null)),
            _ => None,
        }
    }

    /// Call a method on the value, e.g. `"hello".upcase` or `items.join(", ")`.
    pub fn call(&self, method_name: &str, args: &[Value], scope: &Scope) -> Result<Self, Error> {
        Ok(match self {
            Value::Integer(value) => match method_name {
                "abs" => Value::Integer(value.abs()),
                "to_string" | "to_s" | "toString" => Value::String(value.to_string()),
                "to_f" | "to_float" => Value::Float(*value as f64),
                "times" => Value::List((0..*value).map(Value::Integer).collect()),
                _ => return Err(Error::UnknownMethod(method_name.into(), "integer")),
            },

            Value::Float(value) => match method_name {
                "abs" => Value::Float(value.abs()),
                "ceil" => Value::Float(value.ceil()),
                "floor" => Value::Float(value.floor()),
                "round" => Value::Float(value.round()),
                "to_string" | "to_s" | "toString" => Value::String(render_float(*value)),
                "to_i" | "to_integer" => Value::Integer(*value as i64),
                _ => return Err(Error::UnknownMethod(method_name.into(), "float")),
            },

            Value::String(value) => match method_name {
                "to_uppercase" | "upcase" | "toUpperCase" => Value::String(value.to_uppercase()),
                "to_lowercase" | "downcase" | "toLowerCase" => Value::String(value.to_lowercase()),
                "trim" => Value::String(value.trim().to_string()),
                "capitalize" => Value::String(capitalize(value)),
                "len" | "length" => Value::Integer(value.chars().count() as i64),
                "empty" => Value::Boolean(value.is_empty()),
                "includes" | "contains" => match args {
                    [needle] => Value::Boolean(value.contains(needle.render().as_str())),
                    _ => Value::Boolean(false),
                },
                "split" => {
                    let separator = match args {
                        [separator] => separator.render(),
                        _ => String::from(","),
                    };
                    Value::List(
                        value
                            .split(separator.as_str())
                            .map(|part| Value::String(part.to_string()))
                            .collect(),
                    )
                }
                "to_i" | "to_integer" => match value.trim().parse::<i64>() {
                    Ok(i) => Value::Integer(i),
                    Err(_) => Value::Null,
                },
                _ => return Err(Error::UnknownMethod(method_name.into(), "string")),
            },

            Value::List(list) => match method_name.parse::<usize>() {
                Ok(index) => list.get(index).cloned().unwrap_or(Value::Null),

                Err(_) => match method_name {
                    "enumerate" => Value::List(
                        list.iter()
                            .enumerate()
                            .map(|(i, v)| Value::List(vec![Value::Integer(i as i64), v.clone()]))
                            .collect(),
                    ),

                    "flatten" => {
                        let mut new_list = vec![];
                        for value in list {
                            match value {
                                Value::List(inner) => new_list.extend(inner.iter().cloned()),
                                value => new_list.push(value.clone()),
                            }
                        }
                        Value::List(new_list)
                    }

                    "reverse" | "rev" => Value::List(list.iter().rev().cloned().collect()),

                    "contains" | "includes" => match args {
                        [needle] => Value::Boolean(list.contains(needle)),
                        _ => Value::Boolean(false),
                    },

                    "empty" => Value::Boolean(list.is_empty()),

                    "len" | "length" => Value::Integer(list.len() as i64),

                    "first" => list.first().cloned().unwrap_or(Value::Null),

                    "last" => list.last().cloned().unwrap_or(Value::Null),

                    "join" => {
                        let separator = match args {
                            [separator] => separator.render(),
                            _ => String::from(","),
                        };
                        Value::String(
                            list.iter()
                                .map(|v| v.render())
                                .collect::<Vec<_>>()
                                .join(&separator),
                        )
                    }

                    "sum" => list
                        .iter()
                        .fold(Value::Integer(0), |total, value| total.add(value)),

                    "map" => {
                        let function = callable(method_name, args)?;
                        let mut mapped = Vec::with_capacity(list.len());
                        for (i, item) in list.iter().enumerate() {
                            mapped.push(
                                function.call(scope, &[item.clone(), Value::Integer(i as i64)])?,
                            );
                        }
                        Value::List(mapped)
                    }

                    "filter" => {
                        let function = callable(method_name, args)?;
                        let mut kept = vec![];
                        for (i, item) in list.iter().enumerate() {
                            if function
                                .call(scope, &[item.clone(), Value::Integer(i as i64)])?
                                .truthy()
                            {
                                kept.push(item.clone());
                            }
                        }
                        Value::List(kept)
                    }

                    _ => return Err(Error::UnknownMethod(method_name.into(), "list")),
                },
            },

            Value::Hash(hash) => match method_name {
                "keys" => {
                    let mut keys = hash.keys().cloned().collect::<Vec<_>>();
                    keys.sort();
                    Value::List(keys.into_iter().map(Value::String).collect())
                }
                "values" => {
                    let mut entries = hash.iter().collect::<Vec<_>>();
                    entries.sort_by(|a, b| a.0.cmp(b.0));
                    Value::List(entries.into_iter().map(|(_, v)| v.clone()).collect())
                }
                "iter" => {
                    let mut entries = hash.iter().collect::<Vec<_>>();
                    entries.sort_by(|a, b| a.0.cmp(b.0));
                    Value::List(
                        entries
                            .into_iter()
                            .map(|(k, v)| Value::List(vec![Value::String(k.clone()), v.clone()]))
                            .collect(),
                    )
                }
                "len" | "length" => Value::Integer(hash.len() as i64),
                key => hash.get(key).cloned().unwrap_or(Value::Null),
            },

            Value::Interpreter => match method_name {
                "default" => match args {
                    [Value::Null, fallback] => fallback.clone(),
                    [value, _] => value.clone(),
                    _ => Value::Null,
                },

                "range" => match args {
                    [Value::Integer(end)] => Value::List((0..*end).map(Value::Integer).collect()),
                    [Value::Integer(start), Value::Integer(end)] => {
                        Value::List((*start..*end).map(Value::Integer).collect())
                    }
                    _ => Value::List(vec![]),
                },

                "len" => match args {
                    [value] => match value.call("len", &[], scope) {
                        Ok(len) => len,
                        Err(_) => Value::Null,
                    },
                    _ => Value::Null,
                },

                "json" => match args {
                    [value] => Value::String(serde_json::Value::from(value).to_string()),
                    _ => Value::Null,
                },

                _ => return Err(Error::UnknownMethod(method_name.into(), "global")),
            },

            Value::Function(_) | Value::Boolean(_) | Value::Null => {
                return Err(Error::UnknownMethod(method_name.into(), "other"))
            }
        })
    }

    /// Elements to iterate over in an `each` tag.
    pub fn iterate(&self) -> Result<Vec<Value>, Error> {
        match self {
            Value::List(list) => Ok(list.clone()),
            Value::Hash(_) => Ok(match self.call("iter", &[], &Scope::default())? {
                Value::List(entries) => entries,
                _ => vec![],
            }),
            Value::Null => Ok(vec![]),
            value => Err(Error::NotIterable(value.to_string())),
        }
    }
}

fn callable<'a>(method_name: &str, args: &'a [Value]) -> Result<&'a Function, Error> {
    match args {
        [Value::Function(function), ..] => Ok(function),
        _ => Err(Error::Runtime(format!(
            "\"{}\" expects a function argument",
            method_name
        ))),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".into()
    } else if f.is_infinite() {
        if f > 0.0 {
            "Infinity".into()
        } else {
            "-Infinity".into()
        }
    } else {
        f.to_string()
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> serde_json::Value {
        use serde_json::value::Number;
        match value {
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => match Number::from_f64(*f) {
                Some(n) => serde_json::Value::Number(n),
                None => serde_json::Value::Null,
            },
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::List(l) => serde_json::Value::Array(l.iter().map(|v| v.into()).collect()),
            Value::Hash(h) => serde_json::Value::Object(
                h.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
            Value::Function(_) | Value::Null | Value::Interpreter => serde_json::Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(list) => {
                Value::List(list.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(hash) => Value::Hash(
                hash.into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Convert a Rust value into a template value.
pub trait ToValue {
    fn to_value(&self) -> Result<Value, Error>;
}

impl ToValue for String {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(Value::String(self.clone()))
    }
}

impl ToValue for &str {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(Value::String(self.to_string()))
    }
}

macro_rules! impl_integer {
    ($ty:ty) => {
        impl ToValue for $ty {
            fn to_value(&self) -> Result<Value, Error> {
                Ok(Value::Integer(*self as i64))
            }
        }
    };
}

impl_integer!(i64);
impl_integer!(i32);
impl_integer!(i16);
impl_integer!(i8);
impl_integer!(u64); // Could very much overflow
impl_integer!(u32);
impl_integer!(u16);
impl_integer!(u8);
impl_integer!(usize);

impl ToValue for f64 {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(Value::Float(*self))
    }
}

impl ToValue for f32 {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(Value::Float(*self as f64))
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(Value::Boolean(*self))
    }
}

impl ToValue for Value {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(self.clone())
    }
}

impl ToValue for Function {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(Value::Function(self.clone()))
    }
}

impl ToValue for serde_json::Value {
    fn to_value(&self) -> Result<Value, Error> {
        Ok(Value::from(self.clone()))
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Result<Value, Error> {
        match self {
            Some(value) => value.to_value(),
            None => Ok(Value::Null),
        }
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Result<Value, Error> {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for &[T] {
    fn to_value(&self) -> Result<Value, Error> {
        let mut list = vec![];
        for value in self.iter() {
            list.push(value.to_value()?);
        }
        Ok(Value::List(list))
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Result<Value, Error> {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for HashMap<String, T> {
    fn to_value(&self) -> Result<Value, Error> {
        let mut result = HashMap::new();
        for (key, value) in self.iter() {
            result.insert(key.clone(), value.to_value()?);
        }
        Ok(Value::Hash(result))
    }
}
