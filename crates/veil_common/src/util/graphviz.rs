use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("digraphs cannot be nested")]
    NestedDigraph,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(u32);

/// Incremental writer for graphviz dot output. Node ids are allocated by the
/// writer so callers only deal with labels and attribute strings.
#[derive(Debug, Clone)]
pub struct GraphvizWriter {
    tabwidth: u32,
    depth: u32,
    node_count: u32,
}

impl GraphvizWriter {
    pub fn new(tabwidth: u32) -> Self {
        Self {
            tabwidth,
            depth: 0,
            node_count: 0,
        }
    }

    fn write_indent<W: Write>(&self, w: &mut W) -> Result<(), Error> {
        for _ in 0..self.depth * self.tabwidth {
            write!(w, " ")?;
        }
        Ok(())
    }

    pub fn write_digraph<W, F>(&mut self, w: &mut W, f: F) -> Result<(), Error>
    where
        W: Write,
        F: FnOnce(&mut W, &mut GraphvizWriter) -> Result<(), Error>,
    {
        if self.depth > 0 {
            return Err(Error::NestedDigraph);
        }

        writeln!(w, "digraph {{")?;
        self.depth += 1;

        f(w, self)?;

        self.depth -= 1;
        writeln!(w, "}}")?;
        Ok(())
    }

    pub fn write_node<W>(
        &mut self,
        w: &mut W,
        label: &str,
        attrs: Option<&str>,
    ) -> Result<NodeId, Error>
    where
        W: Write,
    {
        let id = self.node_count;
        self.node_count += 1;

        self.write_indent(w)?;

        write!(w, "n{id} [label=\"{}\"", escape_label(label))?;
        if let Some(attrs) = attrs {
            write!(w, ", {}", attrs)?;
        }
        writeln!(w, "];")?;
        Ok(NodeId(id))
    }

    pub fn write_edge<W>(
        &mut self,
        w: &mut W,
        from: NodeId,
        to: NodeId,
        attrs: Option<&str>,
    ) -> Result<(), Error>
    where
        W: Write,
    {
        self.write_indent(w)?;
        write!(w, "n{} -> n{}", from.0, to.0)?;

        if let Some(attrs) = attrs {
            write!(w, " [{}]", attrs)?;
        }

        writeln!(w, ";")?;
        Ok(())
    }
}

fn escape_label(s: &str) -> String {
    let mut escaped = String::new();
    for c in s.chars() {
        match c {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\l"),
            _ => escaped.push(c),
        }
    }
    escaped
}
