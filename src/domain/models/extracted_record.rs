/// Kind of symbol definition captured by a language query (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Class,
    Function,
    Method,
    Interface,
    Enum,
    Variable,
    Decorator,
    Type,
    Module,
}

/// A definition site: a class/function/method/... found in a file.
#[derive(Debug, Clone)]
pub struct Definition {
    pub kind: DefinitionKind,
    pub name: String,
    pub start_line: u32,
    pub end_line: u32,
    pub is_exported: bool,
    /// Enclosing class/module name, when the definition is nested
    /// (e.g. a method's owning class), used to build `Method` nodes with
    /// the right qualified identity.
    pub enclosing_scope: Option<String>,
}

impl Definition {
    pub fn new(kind: DefinitionKind, name: impl Into<String>, start_line: u32, end_line: u32) -> Self {
        Self {
            kind,
            name: name.into(),
            start_line,
            end_line,
            is_exported: false,
            enclosing_scope: None,
        }
    }

    pub fn exported(mut self) -> Self {
        self.is_exported = true;
        self
    }

    pub fn with_enclosing_scope(mut self, scope: impl Into<String>) -> Self {
        self.enclosing_scope = Some(scope.into());
        self
    }
}

/// An import statement's raw source string (spec.md §4.4 step 5).
#[derive(Debug, Clone)]
pub struct ImportStatement {
    pub source: String,
    /// Local alias bound at the import site (`import { foo as bar }`),
    /// when the grammar exposes one.
    pub alias: Option<String>,
}

impl ImportStatement {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// A call expression site (spec.md §4.4 step 5, §4.6).
#[derive(Debug, Clone)]
pub struct CallSite {
    pub callee_name: String,
    pub line: u32,
    pub column: u32,
    /// Name of the innermost enclosing function/method/arrow, found by
    /// walking AST ancestors (spec.md §4.4 "Enclosing-function
    /// resolution"). `None` means the call is attributed to the file
    /// (top-level module code).
    pub enclosing_function: Option<String>,
}

impl CallSite {
    pub fn new(callee_name: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            callee_name: callee_name.into(),
            line,
            column,
            enclosing_function: None,
        }
    }

    pub fn with_enclosing_function(mut self, name: impl Into<String>) -> Self {
        self.enclosing_function = Some(name.into());
        self
    }
}

/// `extends` vs `implements` (spec.md §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeritageKind {
    Extends,
    Implements,
}

/// A heritage clause: `class Derived extends Base` / `class Derived
/// implements Iface` (spec.md §4.7).
#[derive(Debug, Clone)]
pub struct HeritageClause {
    pub child_name: String,
    pub parent_name: String,
    pub kind: HeritageKind,
}

impl HeritageClause {
    pub fn new(child_name: impl Into<String>, parent_name: impl Into<String>, kind: HeritageKind) -> Self {
        Self {
            child_name: child_name.into(),
            parent_name: parent_name.into(),
            kind,
        }
    }
}

/// The tagged variant enumerating what a single query capture represents
/// (spec.md §9 "re-express [match capture maps] as a tagged variant").
/// The query adapter in the connector layer produces a `Vec<Capture>` per
/// file; [`ExtractedRecord::from_captures`] buckets them into the four
/// lists below.
#[derive(Debug, Clone)]
pub enum Capture {
    Definition(Definition),
    Import(ImportStatement),
    Call(CallSite),
    Heritage(HeritageClause),
}

/// Per-file bag of everything extracted by a parse worker (spec.md §3,
/// "ExtractedRecord"). Consumed by the resolver phases and then discarded.
#[derive(Debug, Clone, Default)]
pub struct ExtractedRecord {
    pub file_path: String,
    pub definitions: Vec<Definition>,
    pub imports: Vec<ImportStatement>,
    pub calls: Vec<CallSite>,
    pub heritage: Vec<HeritageClause>,
}

impl ExtractedRecord {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            ..Default::default()
        }
    }

    pub fn from_captures(file_path: impl Into<String>, captures: Vec<Capture>) -> Self {
        let mut record = Self::new(file_path);
        for capture in captures {
            match capture {
                Capture::Definition(d) => record.definitions.push(d),
                Capture::Import(i) => record.imports.push(i),
                Capture::Call(c) => record.calls.push(c),
                Capture::Heritage(h) => record.heritage.push(h),
            }
        }
        record
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
            && self.imports.is_empty()
            && self.calls.is_empty()
            && self.heritage.is_empty()
    }
}
