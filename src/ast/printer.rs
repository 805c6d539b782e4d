use crate::ast::*;

/// Indented pretty-printer for parsed compilation units, used by the
/// driver's `--print-ast` flag and by parser tests.
pub struct AstPrinter {
    out: String,
    indent: usize,
}

impl AstPrinter {
    pub fn new() -> Self {
        Self { out: String::new(), indent: 0 }
    }

    pub fn print(mut self, unit: &CompilationUnit) -> String {
        if !unit.package.is_empty() {
            self.line(&format!("package {};", unit.package));
        }
        for import in &unit.imports {
            self.line(&import.to_string());
        }
        match &unit.ty {
            TypeDeclNode::Class(c) => self.print_class(c),
            TypeDeclNode::Interface(i) => self.print_interface(i),
        }
        self.out
    }

    fn print_class(&mut self, class: &ClassDecl) {
        let mut header = mods_prefix(&class.modifiers);
        header.push_str(&format!("class {}", class.name));
        if let Some(sup) = &class.extends {
            header.push_str(&format!(" extends {}", sup.kind));
        }
        if !class.implements.is_empty() {
            let names: Vec<String> = class.implements.iter().map(|t| t.kind.to_string()).collect();
            header.push_str(&format!(" implements {}", names.join(", ")));
        }
        self.line(&header);
        self.indent += 1;
        for field in &class.fields {
            self.line(&format!(
                "{}{} {}{}",
                mods_prefix(&field.modifiers),
                field.ty.kind,
                field.name,
                if field.init.is_some() { " = <init>" } else { "" }
            ));
        }
        for ctor in &class.constructors {
            let params: Vec<String> = ctor.params.iter().map(|p| p.ty.kind.to_string()).collect();
            self.line(&format!("{}{}({})", mods_prefix(&ctor.modifiers), ctor.name, params.join(", ")));
        }
        for method in &class.methods {
            self.print_method(method);
        }
        self.indent -= 1;
    }

    fn print_interface(&mut self, iface: &InterfaceDecl) {
        let mut header = mods_prefix(&iface.modifiers);
        header.push_str(&format!("interface {}", iface.name));
        if !iface.extends.is_empty() {
            let names: Vec<String> = iface.extends.iter().map(|t| t.kind.to_string()).collect();
            header.push_str(&format!(" extends {}", names.join(", ")));
        }
        self.line(&header);
        self.indent += 1;
        for method in &iface.methods {
            self.print_method(method);
        }
        self.indent -= 1;
    }

    fn print_method(&mut self, method: &MethodDecl) {
        let params: Vec<String> = method.params.iter().map(|p| p.ty.kind.to_string()).collect();
        self.line(&format!(
            "{}{} {}({}){}",
            mods_prefix(&method.modifiers),
            method.return_ty.kind,
            method.name,
            params.join(", "),
            if method.body.is_some() { " {...}" } else { ";" }
        ));
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

fn mods_prefix(modifiers: &[Modifier]) -> String {
    let mut s = String::new();
    for m in modifiers {
        s.push_str(&m.to_string());
        s.push(' ');
    }
    s
}
