//! Generic parsing of structured header values, such as
//! `text/html; charset=utf-8, application/json; q=0.5`.
//!
//! Values are separated by `,`, parameters by `;` and parameter names from their values by `=`.
//! Delimiters inside quoted strings are ignored. Values are sorted by decreasing quality
//! (the `q` parameter), keeping the original order between values of equal quality.

use std::fmt;

/// A parsed header.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    values: Vec<Value>,
}

impl Header {
    pub fn parse(header: &str) -> Self {
        let mut values: Vec<Value> = split(header, ',').into_iter().filter(|v| !v.is_empty()).map(parse_value).collect();
        // sort_by is stable: equal qualities keep their declaration order
        values.sort_by(|a, b| b.quality.total_cmp(&a.quality));
        Self { values }
    }

    /// All values, highest quality first.
    pub fn all(&self) -> &[Value] {
        &self.values
    }

    pub fn first(&self) -> Option<&Value> {
        self.values.first()
    }

    /// The acceptable values (quality above zero), highest quality first.
    pub fn values(&self) -> Vec<&str> {
        self.values.iter().filter(|v| v.acceptable()).map(Value::value).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.values.iter().map(ToString::to_string).collect();
        f.write_str(&values.join(", "))
    }
}

/// One value of a header, along with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    value: String,
    quality: f64,
    parameters: Vec<Parameter>,
}

impl Value {
    pub fn new<S: Into<String>>(value: S, parameters: Vec<Parameter>) -> Self {
        let value = value.into().trim().to_string();
        let quality = quality_of(&parameters);
        Self { value, quality, parameters }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is(&self, value: &str) -> bool {
        self.value == value
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn acceptable(&self) -> bool {
        self.quality > 0.0
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.iter().find(|p| p.is(name)).and_then(Parameter::value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)?;
        for parameter in &self.parameters {
            write!(f, "; {parameter}")?;
        }
        Ok(())
    }
}

/// A `name=value` (or bare `name`) parameter of a header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    name: String,
    value: Option<String>,
}

impl Parameter {
    pub fn new<S: Into<String>>(name: S, value: Option<String>) -> Self {
        Self { name: name.into().trim().to_string(), value: value.map(|v| v.trim().to_string()) }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parameter names are case insensitive.
    pub fn is(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={}", self.name, value),
            None => f.write_str(&self.name),
        }
    }
}

fn parse_value(value: &str) -> Value {
    let tokens = split(value, ';');
    match tokens.split_first() {
        Some((first, rest)) if !is_parameter(first) => Value::new(*first, parameters(rest)),
        _ => Value::new("", parameters(&tokens)),
    }
}

fn is_parameter(token: &str) -> bool {
    split(token, '=').len() > 1
}

fn parameters(tokens: &[&str]) -> Vec<Parameter> {
    tokens
        .iter()
        .map(|token| {
            let parts = split(token, '=');
            let name = parts.first().copied().unwrap_or_default();
            Parameter::new(name, parts.get(1).map(|v| (*v).to_string()))
        })
        .collect()
}

fn quality_of(parameters: &[Parameter]) -> f64 {
    match parameters.first() {
        Some(first) if first.is("q") => first.value().and_then(|q| q.parse::<f64>().ok()).unwrap_or(1.0),
        _ => 1.0,
    }
}

/// Splits on `delimiter` when it is not inside a quoted string, trimming the pieces.
pub(crate) fn split(input: &str, delimiter: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quoted = false;
    let mut start = 0;
    for (index, c) in input.char_indices() {
        if c == '"' {
            quoted = !quoted;
        } else if c == delimiter && !quoted {
            parts.push(input[start..index].trim());
            start = index + c.len_utf8();
        }
    }
    parts.push(input[start..].trim());
    parts
}
