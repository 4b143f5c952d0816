//! Resolved scene commands.
//!
//! A [`Command`] is one fully-resolved instruction ready for execution: a name
//! plus literal arguments, nothing left to evaluate. The generator produces
//! them in program order; the dispatcher consumes them in that same order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// A literal value flowing through slots and command arguments.
///
/// Serialized untagged so program JSON stays readable: numbers are numbers,
/// booleans are booleans, colors are hex/named strings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f32),
    Bool(bool),
    Color(Color),
}

impl Value {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Value::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Short type tag used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Bool(_) => "boolean",
            Value::Color(_) => "color",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Always keep a decimal point so the text is also a valid float
            // literal for the script backend.
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{n:.1}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Color(c) => write!(f, "\"{c}\""),
        }
    }
}

/// One resolved instruction: a command name and its literal arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
    pub args: Vec<Value>,
}

impl Command {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{arg}")?;
        }
        write!(f, ")")
    }
}

/// Render a command sequence as script text, one call per line.
///
/// This is the text submitted to the run log and fed to the script backend.
pub fn render_script(commands: &[Command]) -> String {
    let mut out = String::new();
    for command in commands {
        out.push_str(&command.to_string());
        out.push_str(";\n");
    }
    out
}
