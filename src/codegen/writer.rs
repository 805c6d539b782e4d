//! Assembly text writer: collects instruction lines and tracks which
//! labels a file defines and references, so emission can compute the
//! `global`/`extern` header afterwards.

use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct AsmWriter {
    lines: Vec<String>,
    defined: BTreeSet<String>,
    referenced: BTreeSet<String>,
}

impl AsmWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ins(&mut self, text: impl Into<String>) {
        self.lines.push(format!("    {}", text.into()));
    }

    /// Define a label. Local labels (leading `.`) are scoped to the last
    /// non-local label by the assembler and excluded from linkage tracking.
    pub fn label(&mut self, name: &str) {
        if !name.starts_with('.') {
            self.defined.insert(name.to_string());
        }
        self.lines.push(format!("{name}:"));
    }

    /// Record a reference to a (possibly external) label.
    pub fn reference(&mut self, name: &str) {
        if !name.starts_with('.') {
            self.referenced.insert(name.to_string());
        }
    }

    pub fn section(&mut self, name: &str) {
        self.lines.push(String::new());
        self.lines.push(format!("section {name}"));
    }

    pub fn comment(&mut self, text: &str) {
        self.lines.push(format!("; {text}"));
    }

    pub fn blank(&mut self) {
        self.lines.push(String::new());
    }

    pub fn dd(&mut self, value: impl Into<String>) {
        self.ins(format!("dd {}", value.into()));
    }

    /// Assemble the final file: `global` for every defined symbol,
    /// `extern` for everything referenced but not defined, then the body.
    pub fn finish(self) -> String {
        let mut out = String::new();
        for name in &self.defined {
            out.push_str(&format!("global {name}\n"));
        }
        for name in self.referenced.difference(&self.defined) {
            out.push_str(&format!("extern {name}\n"));
        }
        out.push('\n');
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn globals_and_externs() {
        let mut w = AsmWriter::new();
        w.label("_f");
        w.reference("_g");
        w.reference("_f");
        w.label(".L0");
        w.ins("ret");
        let text = w.finish();
        assert!(text.contains("global _f\n"));
        assert!(text.contains("extern _g\n"));
        assert!(!text.contains("extern _f"));
        assert!(!text.contains("global .L0"));
        assert!(text.contains(".L0:\n"));
    }
}
