//! Line protocol for `settle run`

/// One parsed stdin line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Set the live value
    Set(String),
    /// Set live and settled values at once
    Reset(String),
    /// Stop reading
    Quit,
}

impl Input {
    /// Parse a line; the trailing newline is already stripped
    pub fn parse(line: &str) -> Self {
        if line == ":quit" {
            return Input::Quit;
        }

        match line.strip_prefix(":reset") {
            Some("") => Input::Reset(String::new()),
            Some(rest) if rest.starts_with(' ') => Input::Reset(rest[1..].to_string()),
            _ => Input::Set(line.to_string()),
        }
    }
}
