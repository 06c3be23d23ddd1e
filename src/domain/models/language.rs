use serde::{Deserialize, Serialize};
use std::path::Path;

/// Closed set of parseable languages (spec.md §4.4 step 1).
///
/// Extensible by construction — adding a language means adding a variant,
/// an extension mapping, a tree-sitter grammar, and a query in
/// [`crate::connector::TreeSitterExtractor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Unknown,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "ts" | "tsx" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" => Language::Python,
            _ => Language::Unknown,
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Python => "python",
            Language::Unknown => "unknown",
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Unknown)
    }

    /// Extensions probed by the import resolver, in priority order
    /// (spec.md §4.5 step 1): `.ts, .tsx, .js, .jsx, .py, /index.ts,
    /// /index.js, /__init__.py`.
    pub fn index_suffixes() -> &'static [&'static str] {
        &[
            ".ts",
            ".tsx",
            ".js",
            ".jsx",
            ".py",
            "/index.ts",
            "/index.js",
            "/__init__.py",
        ]
    }

    pub fn all_supported() -> &'static [Language] {
        &[Language::TypeScript, Language::JavaScript, Language::Python]
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_extension_maps_known_languages() {
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("tsx"), Language::TypeScript);
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("PY"), Language::Python);
        assert_eq!(Language::from_extension("rs"), Language::Unknown);
    }

    #[test]
    fn from_path_reads_the_extension() {
        assert_eq!(
            Language::from_path(Path::new("src/a.tsx")),
            Language::TypeScript
        );
        assert_eq!(
            Language::from_path(Path::new("README")),
            Language::Unknown
        );
    }

    #[test]
    fn unknown_is_not_known() {
        assert!(!Language::Unknown.is_known());
        assert!(Language::Python.is_known());
    }
}
