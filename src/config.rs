use crate::core::DEFAULT_NAMESPACE;

/// Knobs for one compilation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Attach encoded source map `mappings` to every emitted form.
    pub source_maps: bool,
    /// Spaces per indentation level in generated PHP.
    pub indent_width: usize,
    /// Install the core macros and inline functions before analyzing.
    pub load_prelude: bool,
    /// Namespace in effect until the source declares one with `ns`.
    pub default_namespace: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source_maps: false,
            indent_width: 2,
            load_prelude: true,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

impl CompileOptions {
    pub fn with_source_maps(mut self) -> Self {
        self.source_maps = true;
        self
    }

    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.indent_width = indent_width;
        self
    }

    pub fn without_prelude(mut self) -> Self {
        self.load_prelude = false;
        self
    }

    pub fn with_default_namespace(mut self, ns: impl Into<String>) -> Self {
        self.default_namespace = ns.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompileOptions::default();
        assert!(!options.source_maps);
        assert_eq!(options.indent_width, 2);
        assert!(options.load_prelude);
        assert_eq!(options.default_namespace, "user");
    }

    #[test]
    fn builders_chain() {
        let options = CompileOptions::default()
            .with_source_maps()
            .with_indent_width(4)
            .without_prelude()
            .with_default_namespace("app\\main");
        assert!(options.source_maps);
        assert_eq!(options.indent_width, 4);
        assert!(!options.load_prelude);
        assert_eq!(options.default_namespace, "app\\main");
    }
}
