use std::fmt;

/// Source-location tag carried by statements and expressions. Diagnostics
/// only: two IR fragments differing solely in positions have the same
/// semantics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: i32,
    pub column: i32,
    /// Identifier assigned by the front end so failures can be mapped back
    /// to the originating source construct.
    pub id: u64,
}

impl Position {
    pub fn new(line: i32, column: i32, id: u64) -> Self {
        Position { line, column, id }
    }

    pub fn is_default(&self) -> bool {
        *self == Position::default()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
