//! Enter phase: build the global type index, link imports, and resolve
//! every declared type reference into the program model.

use std::collections::HashMap;

use crate::ast::*;
use crate::common::error::{Diagnostics, ErrorKind};
use crate::wash::{CtorInfo, FieldInfo, MethodInfo, Program, Ty, TypeId, TypeInfo, TypeKind};

const JAVA_LANG: &str = "java.lang";

/// Build the program model from parsed units. `user_start` is the index of
/// the first non-stdlib unit. Returns `None` only when the model is too
/// broken to continue (duplicate canonical names or a missing stdlib core).
pub fn build_program(
    units: Vec<CompilationUnit>,
    user_start: usize,
    diags: &mut Diagnostics,
) -> Option<Program> {
    let mut types = Vec::with_capacity(units.len());
    let mut by_name: HashMap<String, TypeId> = HashMap::new();
    let mut packages: HashMap<String, Vec<TypeId>> = HashMap::new();

    // Pass 1: canonical names and the package map.
    for (id, unit) in units.iter().enumerate() {
        diags.set_file(&unit.file_name);
        let simple_name = unit.ty.name().to_string();
        let name = if unit.package.is_empty() {
            simple_name.clone()
        } else {
            format!("{}.{}", unit.package, simple_name)
        };

        if let Some(&existing) = by_name.get(&name) {
            diags.error(
                ErrorKind::Environment,
                format!(
                    "duplicate declaration of type '{name}' (first declared in '{}')",
                    units[existing].file_name
                ),
                Some(unit.ty.span()),
            );
        } else {
            by_name.insert(name.clone(), id);
        }
        packages.entry(unit.package.clone()).or_default().push(id);

        let kind = match &unit.ty {
            TypeDeclNode::Class(_) => TypeKind::Class,
            TypeDeclNode::Interface(_) => TypeKind::Interface,
        };
        types.push(TypeInfo {
            id,
            kind,
            package: unit.package.clone(),
            simple_name,
            name,
            modifiers: unit.ty.modifiers().to_vec(),
            extends: Vec::new(),
            implements: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            ctors: Vec::new(),
            single_imports: HashMap::new(),
            on_demand: Vec::new(),
        });
    }
    diags.clear_file();

    if diags.has_errors() {
        return None;
    }

    // No package name (or prefix of one) may resolve to a type, except for
    // types in the default package, which cannot be named from elsewhere.
    for package in packages.keys().filter(|p| !p.is_empty()) {
        let parts: Vec<&str> = package.split('.').collect();
        for k in 1..=parts.len() {
            let prefix = parts[..k].join(".");
            if let Some(&id) = by_name.get(&prefix) {
                if !types[id].package.is_empty() {
                    diags.error(
                        ErrorKind::Environment,
                        format!("package '{package}' clashes with type '{}'", types[id].name),
                        None,
                    );
                }
            }
        }
    }

    let well_known = match Program::lookup_well_known(&by_name) {
        Some(wk) => wk,
        None => {
            diags.error(
                ErrorKind::Environment,
                "missing java.lang core types (Object, String, Cloneable, Serializable)",
                None,
            );
            return None;
        }
    };

    let mut program = Program {
        units,
        user_start,
        types,
        by_name,
        packages,
        well_known,
    };

    // Pass 2: import tables.
    for id in 0..program.units.len() {
        link_imports(&mut program, id, diags);
    }

    // Pass 3: declared type references (supertypes and member signatures).
    for id in 0..program.units.len() {
        enter_members(&mut program, id, diags);
    }

    Some(program)
}

fn link_imports(program: &mut Program, id: TypeId, diags: &mut Diagnostics) {
    diags.set_file(&program.units[id].file_name);
    let mut single_imports: HashMap<String, TypeId> = HashMap::new();
    let mut on_demand: Vec<String> = Vec::new();

    let own_simple = program.types[id].simple_name.clone();
    for import in &program.units[id].imports {
        if import.on_demand {
            // Must name a declared package or a prefix of one.
            let prefix = format!("{}.", import.name);
            let exists = program
                .packages
                .keys()
                .any(|p| *p == import.name || p.starts_with(&prefix));
            if !exists {
                diags.error(
                    ErrorKind::Environment,
                    format!("imported package '{}' does not exist", import.name),
                    Some(import.span),
                );
                continue;
            }
            if !on_demand.contains(&import.name) {
                on_demand.push(import.name.clone());
            }
        } else {
            let simple = import.name.rsplit('.').next().unwrap().to_string();
            let target = match program.by_name.get(&import.name) {
                Some(&target) => target,
                None => {
                    diags.error(
                        ErrorKind::Environment,
                        format!("import '{}' does not resolve to any type", import.name),
                        Some(import.span),
                    );
                    continue;
                }
            };

            // No clash with the type declared in this file, unless the file
            // imports itself.
            if simple == own_simple && target != id {
                diags.error(
                    ErrorKind::Environment,
                    format!("import '{}' clashes with the declared type '{own_simple}'", import.name),
                    Some(import.span),
                );
                continue;
            }

            match single_imports.get(&simple) {
                Some(&prev) if prev != target => {
                    diags.error(
                        ErrorKind::Environment,
                        format!(
                            "import '{}' clashes with import of '{}'",
                            import.name, program.types[prev].name
                        ),
                        Some(import.span),
                    );
                }
                _ => {
                    single_imports.insert(simple, target);
                }
            }
        }
    }

    // java.lang is implicitly on-demand-imported with the lowest priority.
    if !on_demand.iter().any(|p| p == JAVA_LANG) {
        on_demand.push(JAVA_LANG.to_string());
    }

    program.types[id].single_imports = single_imports;
    program.types[id].on_demand = on_demand;
    diags.clear_file();
}

fn enter_members(program: &mut Program, id: TypeId, diags: &mut Diagnostics) {
    diags.set_file(&program.units[id].file_name);

    let mut extends = Vec::new();
    let mut implements = Vec::new();
    let mut fields = Vec::new();
    let mut methods = Vec::new();
    let mut ctors = Vec::new();

    let resolve_named = |program: &Program,
                             ty: &TypeRef,
                             diags: &mut Diagnostics|
     -> Option<TypeId> {
        match &ty.kind {
            TypeRefKind::Named(name) => match program.resolve_type_name(id, name) {
                Ok(target) => Some(target),
                Err(message) => {
                    diags.error(ErrorKind::Environment, message, Some(ty.span));
                    None
                }
            },
            _ => None,
        }
    };

    let resolve_ty = |program: &Program,
                      ty: &TypeRef,
                      diags: &mut Diagnostics|
     -> Ty {
        match program.resolve_type_ref(id, &ty.kind) {
            Ok(ty) => ty,
            Err(message) => {
                diags.error(ErrorKind::Environment, message, Some(ty.span));
                // Recover with Object so later phases can continue.
                Ty::Ref(program.well_known.object)
            }
        }
    };

    match &program.units[id].ty {
        TypeDeclNode::Class(class) => {
            if let Some(sup) = &class.extends {
                if let Some(target) = resolve_named(program, sup, diags) {
                    extends.push(target);
                }
            }
            for iface in &class.implements {
                if let Some(target) = resolve_named(program, iface, diags) {
                    if implements.contains(&target) {
                        diags.error(
                            ErrorKind::Hierarchy,
                            format!("interface '{}' implemented twice", program.types[target].name),
                            Some(iface.span),
                        );
                    } else {
                        implements.push(target);
                    }
                }
            }
            for (index, field) in class.fields.iter().enumerate() {
                fields.push(FieldInfo {
                    name: field.name.clone(),
                    modifiers: field.modifiers.clone(),
                    ty: resolve_ty(program, &field.ty, diags),
                    index,
                    has_init: field.init.is_some(),
                });
            }
            for (index, method) in class.methods.iter().enumerate() {
                for ty in &method.throws {
                    resolve_named(program, ty, diags);
                }
                methods.push(MethodInfo {
                    name: method.name.clone(),
                    modifiers: method.modifiers.clone(),
                    ret: resolve_ty(program, &method.return_ty, diags),
                    params: method.params.iter().map(|p| resolve_ty(program, &p.ty, diags)).collect(),
                    index,
                    has_body: method.body.is_some(),
                });
            }
            for (index, ctor) in class.constructors.iter().enumerate() {
                if ctor.name != class.name {
                    diags.error(
                        ErrorKind::Environment,
                        format!("constructor '{}' must be named '{}'", ctor.name, class.name),
                        Some(ctor.span),
                    );
                }
                for ty in &ctor.throws {
                    resolve_named(program, ty, diags);
                }
                ctors.push(CtorInfo {
                    modifiers: ctor.modifiers.clone(),
                    params: ctor.params.iter().map(|p| resolve_ty(program, &p.ty, diags)).collect(),
                    index: Some(index),
                });
            }
            // A class with no declared constructor gets an implicit public
            // default constructor.
            if ctors.is_empty() {
                ctors.push(CtorInfo {
                    modifiers: vec![Modifier::Public],
                    params: Vec::new(),
                    index: None,
                });
            }
        }
        TypeDeclNode::Interface(iface) => {
            for sup in &iface.extends {
                if let Some(target) = resolve_named(program, sup, diags) {
                    if extends.contains(&target) {
                        diags.error(
                            ErrorKind::Hierarchy,
                            format!("interface '{}' extended twice", program.types[target].name),
                            Some(sup.span),
                        );
                    } else {
                        extends.push(target);
                    }
                }
            }
            for (index, method) in iface.methods.iter().enumerate() {
                for ty in &method.throws {
                    resolve_named(program, ty, diags);
                }
                // Interface methods are implicitly public and abstract.
                let mut modifiers = method.modifiers.clone();
                if !modifiers.contains(&Modifier::Public) {
                    modifiers.push(Modifier::Public);
                }
                if !modifiers.contains(&Modifier::Abstract) {
                    modifiers.push(Modifier::Abstract);
                }
                methods.push(MethodInfo {
                    name: method.name.clone(),
                    modifiers,
                    ret: resolve_ty(program, &method.return_ty, diags),
                    params: method.params.iter().map(|p| resolve_ty(program, &p.ty, diags)).collect(),
                    index,
                    has_body: false,
                });
            }
        }
    }

    let info = &mut program.types[id];
    info.extends = extends;
    info.implements = implements;
    info.fields = fields;
    info.methods = methods;
    info.ctors = ctors;
    diags.clear_file();
}
