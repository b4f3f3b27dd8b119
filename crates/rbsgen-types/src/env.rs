//! The signature environment: every loaded declaration, and the instance
//! definitions built from them.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use walkdir::WalkDir;

use crate::definition::{InstanceDefinition, LookupError, MethodDefinition, TypeRepository};
use crate::name::{TypeName, TypeNameKind};
use crate::sig::{
    parse_signature, AttributeKind, Declaration, Member, Parent, SigParseError, TypeParam,
};
use crate::ty::{MethodType, Param, Params, Substitution, Type};

/// Signatures of the core classes, loaded by [`Environment::with_core`].
pub const CORE_SIGNATURES: &str = include_str!("core.rbs");

/// An error while loading signature files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: SigParseError,
    },
}

/// Outcome of loading a directory tree: files that loaded, and per-file
/// failures that were skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub files: usize,
    pub errors: Vec<LoadError>,
}

impl LoadReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// One `class`/`module` block. Reopened classes have several.
#[derive(Debug, Clone)]
struct Fragment {
    /// Namespace used to resolve relative names written in the block
    context: Vec<SmolStr>,
    super_class: Option<Parent>,
    members: Vec<Member>,
}

#[derive(Debug, Clone)]
struct ClassEntry {
    is_module: bool,
    type_params: Vec<SmolStr>,
    fragments: Vec<Fragment>,
}

#[derive(Debug, Clone)]
struct InterfaceEntry {
    context: Vec<SmolStr>,
    type_params: Vec<SmolStr>,
    members: Vec<Member>,
}

#[derive(Debug, Clone)]
struct AliasEntry {
    context: Vec<SmolStr>,
    ty: Type,
}

#[derive(Debug, Clone)]
struct ClassAliasEntry {
    context: Vec<SmolStr>,
    old_name: TypeName,
}

/// All loaded declarations keyed by absolute name.
#[derive(Debug, Default)]
pub struct Environment {
    classes: IndexMap<TypeName, ClassEntry>,
    interfaces: IndexMap<TypeName, InterfaceEntry>,
    aliases: IndexMap<TypeName, AliasEntry>,
    class_aliases: IndexMap<TypeName, ClassAliasEntry>,
    cache: RwLock<FxHashMap<TypeName, Arc<InstanceDefinition>>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment preloaded with the bundled core signatures.
    pub fn with_core() -> Result<Self, SigParseError> {
        let mut env = Self::new();
        env.load_str(CORE_SIGNATURES)?;
        Ok(env)
    }

    pub fn load_str(&mut self, source: &str) -> Result<(), SigParseError> {
        let declarations = parse_signature(source)?;
        self.add_declarations(declarations);
        Ok(())
    }

    pub fn load_file(&mut self, path: &Path) -> Result<(), LoadError> {
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&source).map_err(|source| LoadError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load every `.rbs` file under `root`, in path order. A file that fails
    /// to load is reported and skipped.
    pub fn load_dir(&mut self, root: &Path) -> LoadReport {
        let mut report = LoadReport::default();
        if !root.exists() {
            report.errors.push(LoadError::Io {
                path: root.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            });
            return report;
        }

        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |ext| ext != "rbs") {
                continue;
            }
            match self.load_file(path) {
                Ok(()) => report.files += 1,
                Err(err) => report.errors.push(err),
            }
        }
        report
    }

    pub fn add_declarations(&mut self, declarations: Vec<Declaration>) {
        self.clear_cache();
        for declaration in declarations {
            self.add_declaration(declaration, &[]);
        }
    }

    fn clear_cache(&mut self) {
        match self.cache.get_mut() {
            Ok(cache) => cache.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    fn add_declaration(&mut self, declaration: Declaration, outer: &[SmolStr]) {
        match declaration {
            Declaration::Class(class) => {
                let name = class.name.in_context(outer);
                self.add_class(
                    name,
                    false,
                    class.type_params,
                    class.super_class,
                    class.members,
                );
            }
            Declaration::Module(module) => {
                let name = module.name.in_context(outer);
                self.add_class(name, true, module.type_params, None, module.members);
            }
            Declaration::Interface(interface) => {
                let name = interface.name.in_context(outer);
                self.interfaces.insert(
                    name,
                    InterfaceEntry {
                        context: outer.to_vec(),
                        type_params: param_names(&interface.type_params),
                        members: interface.members,
                    },
                );
            }
            Declaration::TypeAlias(alias) => {
                let name = alias.name.in_context(outer);
                self.aliases.insert(
                    name,
                    AliasEntry {
                        context: outer.to_vec(),
                        ty: alias.ty,
                    },
                );
            }
            Declaration::ClassAlias(alias) => {
                let name = alias.new_name.in_context(outer);
                self.class_aliases.insert(
                    name,
                    ClassAliasEntry {
                        context: outer.to_vec(),
                        old_name: alias.old_name,
                    },
                );
            }
        }
    }

    fn add_class(
        &mut self,
        name: TypeName,
        is_module: bool,
        type_params: Vec<TypeParam>,
        super_class: Option<Parent>,
        members: Vec<Member>,
    ) {
        let context = name.segments();
        let mut own = Vec::new();
        let mut nested = Vec::new();
        for member in members {
            match member {
                Member::Declaration(declaration) => nested.push(declaration),
                other => own.push(other),
            }
        }

        let entry = self.classes.entry(name).or_insert_with(|| ClassEntry {
            is_module,
            type_params: param_names(&type_params),
            fragments: Vec::new(),
        });
        entry.fragments.push(Fragment {
            context: context.clone(),
            super_class,
            members: own,
        });

        for declaration in nested {
            self.add_declaration(declaration, &context);
        }
    }

    pub fn contains(&self, name: &TypeName) -> bool {
        let name = name.absolute();
        self.classes.contains_key(&name)
            || self.interfaces.contains_key(&name)
            || self.aliases.contains_key(&name)
            || self.class_aliases.contains_key(&name)
    }

    /// Whether `name` was declared with `module`.
    pub fn is_module(&self, name: &TypeName) -> bool {
        self.classes
            .get(&name.absolute())
            .is_some_and(|entry| entry.is_module)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &TypeName> {
        self.classes.keys()
    }

    /// Resolve a relative name written inside `context`: the innermost
    /// enclosing namespace that declares it wins, then the root.
    pub fn resolve(&self, name: &TypeName, context: &[SmolStr]) -> TypeName {
        if name.absolute {
            return name.clone();
        }
        (0..=context.len())
            .rev()
            .map(|depth| name.in_context(&context[..depth]))
            .find(|candidate| self.contains(candidate))
            .unwrap_or_else(|| name.absolute())
    }

    /// Names resolve innermost context first. Those that land on the root
    /// declaration stay as written; nested matches become absolute.
    fn qualify(&self, name: &TypeName, context: &[SmolStr]) -> TypeName {
        if name.absolute {
            return name.clone();
        }
        let resolved = self.resolve(name, context);
        if resolved == name.absolute() || !self.contains(&resolved) {
            name.clone()
        } else {
            resolved
        }
    }

    fn qualify_method_type(&self, method_type: &MethodType, context: &[SmolStr]) -> MethodType {
        method_type.map_names(&|name: &TypeName| self.qualify(name, context))
    }

    // ========================================================================
    // Definition building
    // ========================================================================

    fn definition(
        &self,
        name: &TypeName,
        visiting: &mut Vec<TypeName>,
    ) -> Result<Arc<InstanceDefinition>, LookupError> {
        let name = name.absolute();
        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(definition) = cache.get(&name) {
                return Ok(definition.clone());
            }
        }
        if visiting.contains(&name) {
            return Err(LookupError::Cyclic(name));
        }

        visiting.push(name.clone());
        let built = self.build(&name, visiting);
        visiting.pop();

        let definition = Arc::new(built?);
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        Ok(cache.entry(name).or_insert(definition).clone())
    }

    fn build(
        &self,
        name: &TypeName,
        visiting: &mut Vec<TypeName>,
    ) -> Result<InstanceDefinition, LookupError> {
        match name.kind() {
            TypeNameKind::Class => {
                if let Some(alias) = self.class_aliases.get(name) {
                    let target = self.resolve(&alias.old_name, &alias.context);
                    let definition = self.ancestor(name, &target, visiting)?;
                    return Ok((*definition).clone());
                }
                match self.classes.get(name) {
                    Some(entry) => self.build_class(name, entry, visiting),
                    None => Err(LookupError::UnknownType(name.clone())),
                }
            }
            TypeNameKind::Interface => match self.interfaces.get(name) {
                Some(entry) => self.build_interface(name, entry, visiting),
                None => Err(LookupError::UnknownType(name.clone())),
            },
            TypeNameKind::Alias => match self.aliases.get(name) {
                Some(entry) => self.build_alias(name, entry, visiting),
                None => Err(LookupError::UnknownType(name.clone())),
            },
        }
    }

    /// Build a definition this one depends on. An unknown ancestor makes the
    /// dependent definition malformed.
    fn ancestor(
        &self,
        owner: &TypeName,
        ancestor: &TypeName,
        visiting: &mut Vec<TypeName>,
    ) -> Result<Arc<InstanceDefinition>, LookupError> {
        self.definition(ancestor, visiting).map_err(|err| match err {
            LookupError::UnknownType(missing) => LookupError::Malformed {
                name: owner.clone(),
                reason: format!("unknown ancestor {}", missing),
            },
            other => other,
        })
    }

    fn build_alias(
        &self,
        name: &TypeName,
        entry: &AliasEntry,
        visiting: &mut Vec<TypeName>,
    ) -> Result<InstanceDefinition, LookupError> {
        let target = match &entry.ty {
            Type::ClassInstance { name: target, .. }
            | Type::Interface { name: target, .. }
            | Type::Alias { name: target, .. } => self.resolve(target, &entry.context),
            other => {
                return Err(LookupError::Malformed {
                    name: name.clone(),
                    reason: format!("alias of `{}` has no instance definition", other),
                })
            }
        };
        let definition = self.ancestor(name, &target, visiting)?;
        Ok((*definition).clone())
    }

    fn build_class(
        &self,
        name: &TypeName,
        entry: &ClassEntry,
        visiting: &mut Vec<TypeName>,
    ) -> Result<InstanceDefinition, LookupError> {
        let mut definition = InstanceDefinition::new(name.clone());
        definition.type_params = entry.type_params.clone();

        if !entry.is_module {
            let explicit = entry.fragments.iter().find_map(|fragment| {
                fragment
                    .super_class
                    .as_ref()
                    .map(|parent| (parent, fragment.context.as_slice()))
            });
            match explicit {
                Some((parent, context)) => {
                    self.inherit(&mut definition, parent, context, visiting)?;
                }
                None => {
                    let object = TypeName::new(Vec::new(), "Object", true);
                    let basic = TypeName::new(Vec::new(), "BasicObject", true);
                    if *name != object && *name != basic && self.classes.contains_key(&object) {
                        let parent = Parent {
                            name: object,
                            args: Vec::new(),
                        };
                        self.inherit(&mut definition, &parent, &[], visiting)?;
                    }
                }
            }
        }

        for fragment in &entry.fragments {
            for member in &fragment.members {
                if let Member::Include(parent) = member {
                    self.inherit(&mut definition, parent, &fragment.context, visiting)?;
                }
            }
        }

        for fragment in &entry.fragments {
            self.add_own_members(&mut definition, &fragment.members, &fragment.context);
        }

        for fragment in &entry.fragments {
            for member in &fragment.members {
                if let Member::Prepend(parent) = member {
                    self.inherit(&mut definition, parent, &fragment.context, visiting)?;
                }
            }
        }

        for fragment in &entry.fragments {
            apply_aliases(&mut definition, &fragment.members)?;
        }

        Ok(definition)
    }

    fn build_interface(
        &self,
        name: &TypeName,
        entry: &InterfaceEntry,
        visiting: &mut Vec<TypeName>,
    ) -> Result<InstanceDefinition, LookupError> {
        let mut definition = InstanceDefinition::new(name.clone());
        definition.type_params = entry.type_params.clone();

        for member in &entry.members {
            if let Member::Include(parent) = member {
                self.inherit(&mut definition, parent, &entry.context, visiting)?;
            }
        }
        self.add_own_members(&mut definition, &entry.members, &entry.context);
        apply_aliases(&mut definition, &entry.members)?;

        Ok(definition)
    }

    /// Copy the methods of `parent` into `definition`, binding the parent's
    /// type parameters to the written arguments. Missing arguments are
    /// `untyped`.
    fn inherit(
        &self,
        definition: &mut InstanceDefinition,
        parent: &Parent,
        context: &[SmolStr],
        visiting: &mut Vec<TypeName>,
    ) -> Result<(), LookupError> {
        let parent_name = self.resolve(&parent.name, context);
        let inherited = self.ancestor(&definition.type_name, &parent_name, visiting)?;

        let subst: Substitution = inherited
            .type_params
            .iter()
            .enumerate()
            .map(|(i, param)| {
                let arg = parent
                    .args
                    .get(i)
                    .map(|arg| arg.map_names(&|name: &TypeName| self.qualify(name, context)))
                    .unwrap_or(Type::Any);
                (param.clone(), arg)
            })
            .collect();

        for (method_name, method) in &inherited.methods {
            definition.methods.insert(
                method_name.clone(),
                MethodDefinition {
                    name: method.name.clone(),
                    defs: method.defs.iter().map(|def| def.substitute(&subst)).collect(),
                    defined_in: method.defined_in.clone(),
                },
            );
        }
        Ok(())
    }

    fn add_own_members(
        &self,
        definition: &mut InstanceDefinition,
        members: &[Member],
        context: &[SmolStr],
    ) {
        for member in members {
            match member {
                Member::Method {
                    name,
                    scope,
                    overloads,
                    overloading,
                } if scope.includes_instance() => {
                    let mut defs: Vec<MethodType> = overloads
                        .iter()
                        .map(|def| self.qualify_method_type(def, context))
                        .collect();
                    if *overloading {
                        if let Some(existing) = definition.methods.get(name) {
                            defs.extend(existing.defs.iter().cloned());
                        }
                    }
                    let method = MethodDefinition {
                        name: name.clone(),
                        defs,
                        defined_in: definition.type_name.clone(),
                    };
                    definition.methods.insert(name.clone(), method);
                }
                Member::Attribute {
                    kind,
                    name,
                    ty,
                    scope,
                } if scope.includes_instance() => {
                    let ty = ty.map_names(&|name: &TypeName| self.qualify(name, context));
                    if matches!(kind, AttributeKind::Reader | AttributeKind::Accessor) {
                        let reader = MethodDefinition {
                            name: name.clone(),
                            defs: vec![MethodType::returning(ty.clone())],
                            defined_in: definition.type_name.clone(),
                        };
                        definition.methods.insert(name.clone(), reader);
                    }
                    if matches!(kind, AttributeKind::Writer | AttributeKind::Accessor) {
                        let writer_name = SmolStr::from(format!("{}=", name));
                        let writer = MethodDefinition {
                            name: writer_name.clone(),
                            defs: vec![MethodType {
                                type_params: Vec::new(),
                                params: Params {
                                    required: vec![Param {
                                        ty: ty.clone(),
                                        name: Some(name.clone()),
                                    }],
                                    ..Params::default()
                                },
                                block: None,
                                return_type: ty,
                            }],
                            defined_in: definition.type_name.clone(),
                        };
                        definition.methods.insert(writer_name, writer);
                    }
                }
                _ => {}
            }
        }
    }
}

fn param_names(params: &[TypeParam]) -> Vec<SmolStr> {
    params.iter().map(|param| param.name.clone()).collect()
}

/// `alias new old` copies the overloads of `old`, which must already exist.
fn apply_aliases(definition: &mut InstanceDefinition, members: &[Member]) -> Result<(), LookupError> {
    for member in members {
        let Member::Alias {
            new_name,
            old_name,
            scope,
        } = member
        else {
            continue;
        };
        if !scope.includes_instance() {
            continue;
        }
        let Some(original) = definition.methods.get(old_name) else {
            return Err(LookupError::Malformed {
                name: definition.type_name.clone(),
                reason: format!("alias `{}` of unknown method `{}`", new_name, old_name),
            });
        };
        let aliased = MethodDefinition {
            name: new_name.clone(),
            defs: original.defs.clone(),
            defined_in: original.defined_in.clone(),
        };
        definition.methods.insert(new_name.clone(), aliased);
    }
    Ok(())
}

impl TypeRepository for Environment {
    fn instance_definition(&self, name: &TypeName) -> Result<Arc<InstanceDefinition>, LookupError> {
        self.definition(name, &mut Vec::new())
    }
}
