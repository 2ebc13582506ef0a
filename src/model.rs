//! Entity definitions for the whole-program symbol graph.
//!
//! Entities are owned by a single [`Program`] arena; references between them
//! are plain indices, never `Rc`/`&` back-references, so recursive call
//! graphs and mutual references don't fight the borrow checker.

use std::path::PathBuf;

macro_rules! entity_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);
    };
}

entity_id!(GlobalDeclId);
entity_id!(InterruptEntryId);
entity_id!(FunctionId);
entity_id!(ConstantId);
entity_id!(InitializerId);
entity_id!(ModuleId);

/// A source location, used on every entity and in every diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Loc {
    pub path: PathBuf,
    pub line: usize,
}

impl Loc {
    #[must_use]
    pub fn new(path: PathBuf, line: usize) -> Self {
        Self { path, line }
    }
}

impl std::fmt::Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// A `.globl NAME` directive.
#[derive(Debug, Clone)]
pub struct GlobalDecl {
    pub loc: Loc,
    pub name: String,
}

/// An `int NAME` vector table slot.
#[derive(Debug, Clone)]
pub struct InterruptEntry {
    pub loc: Loc,
    pub name: String,
}

/// A function body found in the code area.
#[derive(Debug, Clone)]
pub struct Function {
    pub loc: Loc,
    pub end_line: usize,
    pub name: String,

    /// Raw call targets collected during parsing, not yet resolved.
    pub calls_out: Vec<String>,
    /// Raw long-read label operands, not yet resolved.
    pub long_reads: Vec<String>,

    pub resolved_refs: Vec<FunctionId>,
    pub resolved_consts: Vec<ConstantId>,
    pub external_refs: Vec<String>,
    pub external_consts: Vec<String>,
    pub global_decls: Vec<GlobalDeclId>,
    pub isr_decl: Option<InterruptEntryId>,
    pub is_empty: bool,
}

impl Function {
    #[must_use]
    pub fn new(loc: Loc, name: String) -> Self {
        Self {
            loc,
            end_line: 0,
            name,
            calls_out: Vec::new(),
            long_reads: Vec::new(),
            resolved_refs: Vec::new(),
            resolved_consts: Vec::new(),
            external_refs: Vec::new(),
            external_consts: Vec::new(),
            global_decls: Vec::new(),
            isr_decl: None,
            is_empty: true,
        }
    }

    #[must_use]
    pub fn start_line(&self) -> usize {
        self.loc.line
    }
}

/// A constant found in the const area.
#[derive(Debug, Clone)]
pub struct Constant {
    pub loc: Loc,
    pub end_line: usize,
    pub name: String,
    pub global_decls: Vec<GlobalDeclId>,
}

impl Constant {
    #[must_use]
    pub fn new(loc: Loc, name: String) -> Self {
        Self {
            loc,
            end_line: 0,
            name,
            global_decls: Vec::new(),
        }
    }

    #[must_use]
    pub fn start_line(&self) -> usize {
        self.loc.line
    }
}

/// A data table found in the `INITIALIZER` area; seeds function/constant pointers.
#[derive(Debug, Clone)]
pub struct Initializer {
    pub loc: Loc,
    pub end_line: usize,
    pub name: String,
    pub pointer_names: Vec<String>,

    pub resolved_function_ptrs: Vec<FunctionId>,
    pub resolved_constant_ptrs: Vec<ConstantId>,
    pub unresolved_ptrs: Vec<String>,
}

impl Initializer {
    #[must_use]
    pub fn new(loc: Loc, name: String) -> Self {
        Self {
            loc,
            end_line: 0,
            name,
            pointer_names: Vec::new(),
            resolved_function_ptrs: Vec::new(),
            resolved_constant_ptrs: Vec::new(),
            unresolved_ptrs: Vec::new(),
        }
    }
}

/// A symbol row parsed from a `.rel`/`.lib` `S` line.
#[derive(Debug, Clone)]
pub struct ObjectSymbol {
    pub name: String,
    pub line: usize,
}

/// Either a kept [`Function`] or a kept [`Constant`]; a [`Module`]'s outbound
/// edges may point at either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionOrConstant {
    Function(FunctionId),
    Constant(ConstantId),
}

/// A Function or Initializer that holds an unresolved reference to one of a
/// [`Module`]'s exported symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Referrer {
    Function(FunctionId),
    Initializer(InitializerId),
}

/// A translation unit parsed out of a `.rel`/`.lib` file.
#[derive(Debug, Clone)]
pub struct Module {
    pub path: PathBuf,
    pub header_line: usize,
    pub name: String,
    pub defined_symbols: Vec<ObjectSymbol>,
    pub referenced_symbols: Vec<ObjectSymbol>,

    /// Functions/Initializers that reference one of this module's exports.
    pub inbound: Vec<Referrer>,
    /// What this module needs from the parsed translation units, once it's pulled in.
    pub outbound: Vec<FunctionOrConstant>,
}

pub const UNNAMED_MODULE: &str = "UNNAMED MODULE";

impl Module {
    #[must_use]
    pub fn new(path: PathBuf, header_line: usize) -> Self {
        Self {
            path,
            header_line,
            name: UNNAMED_MODULE.to_string(),
            defined_symbols: Vec::new(),
            referenced_symbols: Vec::new(),
            inbound: Vec::new(),
            outbound: Vec::new(),
        }
    }
}

/// Owns every entity parsed from every input file for the duration of a run.
///
/// All cross-entity references are indices into these vectors. Entities are
/// appended during parsing and resolution and never removed; the remove/keep
/// partitioning happens downstream over id sets, not by mutating the arena.
#[derive(Debug, Default)]
pub struct Program {
    pub globals: Vec<GlobalDecl>,
    pub interrupts: Vec<InterruptEntry>,
    pub functions: Vec<Function>,
    pub constants: Vec<Constant>,
    pub initializers: Vec<Initializer>,
    pub modules: Vec<Module>,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_global(&mut self, g: GlobalDecl) -> GlobalDeclId {
        self.globals.push(g);
        GlobalDeclId(self.globals.len() - 1)
    }

    pub fn push_interrupt(&mut self, i: InterruptEntry) -> InterruptEntryId {
        self.interrupts.push(i);
        InterruptEntryId(self.interrupts.len() - 1)
    }

    pub fn push_function(&mut self, f: Function) -> FunctionId {
        self.functions.push(f);
        FunctionId(self.functions.len() - 1)
    }

    pub fn push_constant(&mut self, c: Constant) -> ConstantId {
        self.constants.push(c);
        ConstantId(self.constants.len() - 1)
    }

    pub fn push_initializer(&mut self, i: Initializer) -> InitializerId {
        self.initializers.push(i);
        InitializerId(self.initializers.len() - 1)
    }

    pub fn push_module(&mut self, m: Module) -> ModuleId {
        self.modules.push(m);
        ModuleId(self.modules.len() - 1)
    }

    #[must_use]
    pub fn function(&self, id: FunctionId) -> &Function {
        &self.functions[id.0]
    }

    #[must_use]
    pub fn function_mut(&mut self, id: FunctionId) -> &mut Function {
        &mut self.functions[id.0]
    }

    #[must_use]
    pub fn constant(&self, id: ConstantId) -> &Constant {
        &self.constants[id.0]
    }

    #[must_use]
    pub fn constant_mut(&mut self, id: ConstantId) -> &mut Constant {
        &mut self.constants[id.0]
    }

    #[must_use]
    pub fn initializer(&self, id: InitializerId) -> &Initializer {
        &self.initializers[id.0]
    }

    #[must_use]
    pub fn global(&self, id: GlobalDeclId) -> &GlobalDecl {
        &self.globals[id.0]
    }

    #[must_use]
    pub fn interrupt(&self, id: InterruptEntryId) -> &InterruptEntry {
        &self.interrupts[id.0]
    }

    #[must_use]
    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    #[must_use]
    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0]
    }

    /// Functions in input-file-then-source-line order with the given name.
    #[must_use]
    pub fn functions_by_name(&self, name: &str) -> Vec<FunctionId> {
        self.functions
            .iter()
            .enumerate()
            .filter(|(_, f)| f.name == name)
            .map(|(i, _)| FunctionId(i))
            .collect()
    }

    #[must_use]
    pub fn constants_by_name(&self, name: &str) -> Vec<ConstantId> {
        self.constants
            .iter()
            .enumerate()
            .filter(|(_, c)| c.name == name)
            .map(|(i, _)| ConstantId(i))
            .collect()
    }

    /// Looks up a function by file-basename and name, as used by the
    /// `FILE.asm:NAME` exclusion syntax.
    #[must_use]
    pub fn function_by_filename_name(&self, filename: &str, name: &str) -> Option<FunctionId> {
        self.functions
            .iter()
            .enumerate()
            .find(|(_, f)| {
                f.name == name
                    && f.loc
                        .path
                        .file_name()
                        .is_some_and(|f| f == filename)
            })
            .map(|(i, _)| FunctionId(i))
    }

    #[must_use]
    pub fn constant_by_filename_name(&self, filename: &str, name: &str) -> Option<ConstantId> {
        self.constants
            .iter()
            .enumerate()
            .find(|(_, c)| {
                c.name == name
                    && c.loc
                        .path
                        .file_name()
                        .is_some_and(|f| f == filename)
            })
            .map(|(i, _)| ConstantId(i))
    }
}
