// Abstract Syntax Tree for dashboard shell scripts

/// A whole script: commands run in order
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub commands: Vec<Command>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Load(LoadTarget),
    /// Selection edits, applied left to right
    Set(Vec<Assignment>),
    Preview { rows: Option<usize> },
    Summary,
    Schema,
    /// Chart image to `path`, or stdout when absent
    Render { path: Option<String> },
    /// Chart description as JSON
    Export { path: Option<String> },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Load(_) => "load",
            Command::Set(_) => "set",
            Command::Preview { .. } => "preview",
            Command::Summary => "summary",
            Command::Schema => "schema",
            Command::Render { .. } => "render",
            Command::Export { .. } => "export",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadTarget {
    Sample,
    Stdin,
    Url(String),
    File(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Bare word: a column name, chart type or keyword
    Ident(String),
    /// Quoted string, for names that are not bare words
    Str(String),
    Number(f64),
}

impl Value {
    pub fn as_text(&self) -> String {
        match self {
            Value::Ident(s) | Value::Str(s) => s.clone(),
            Value::Number(n) => n.to_string(),
        }
    }
}
