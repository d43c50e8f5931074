use std::fmt;

/// Helper for building dot/index annotated paths through nested columns.
#[derive(Debug, Clone)]
pub(crate) struct Path {
    pub(crate) column: usize,
    pub(crate) path: String,
}

impl Path {
    pub(crate) fn new(column: usize, name: &str) -> Self {
        Self {
            column,
            path: name.to_string(),
        }
    }

    pub(crate) fn push_field(&self, name: &str) -> Self {
        let mut next = self.path.clone();
        if !next.is_empty() {
            next.push('.');
        }
        next.push_str(name);
        Self {
            column: self.column,
            path: next,
        }
    }

    pub(crate) fn push_item(&self) -> Self {
        let mut next = self.path.clone();
        next.push_str("[]");
        Self {
            column: self.column,
            path: next,
        }
    }

    pub(crate) fn push_key(&self) -> Self {
        let mut next = self.path.clone();
        next.push_str(".<key>");
        Self {
            column: self.column,
            path: next,
        }
    }

    pub(crate) fn push_value(&self) -> Self {
        let mut next = self.path.clone();
        next.push_str(".<value>");
        Self {
            column: self.column,
            path: next,
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

impl From<&Path> for String {
    fn from(path: &Path) -> Self {
        path.path.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::Path;

    #[test]
    fn nested_segments() {
        let root = Path::new(2, "events");
        let p = root.push_item().push_field("payload").push_key();
        assert_eq!(p.column, 2);
        assert_eq!(p.to_string(), "events[].payload.<key>");
        assert_eq!(root.push_value().path, "events.<value>");
    }
}
