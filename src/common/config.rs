use std::path::PathBuf;

/// Register allocation strategy, selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptLevel {
    /// Every temporary lives in a stack slot; operands reload on every use.
    #[default]
    None,
    /// Linear-scan register allocation over live intervals.
    RegAlloc,
}

/// Compilation configuration for the joosc pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    pub opt: OptLevel,
    /// Print phase progress to stderr.
    pub verbose: bool,
    /// Only report errors.
    pub quiet: bool,
    /// Directory the `.s` files are written into.
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            opt: OptLevel::None,
            verbose: false,
            quiet: false,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Parse an `--opt` pass-set name. Unknown names are reported back to
    /// the caller and leave the level unchanged, matching the original
    /// driver's behaviour for unrecognized optimizations.
    pub fn apply_opt_name(&mut self, name: &str) -> std::result::Result<(), String> {
        match name {
            "none" | "opt-none" => {
                self.opt = OptLevel::None;
                Ok(())
            }
            "reg" | "reg-only" | "opt-reg-only" => {
                self.opt = OptLevel::RegAlloc;
                Ok(())
            }
            other => Err(format!("unknown optimization set '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_names_parse() {
        let mut config = Config::default();
        assert!(config.apply_opt_name("reg-only").is_ok());
        assert_eq!(config.opt, OptLevel::RegAlloc);
        assert!(config.apply_opt_name("none").is_ok());
        assert_eq!(config.opt, OptLevel::None);
        assert!(config.apply_opt_name("vectorize").is_err());
    }
}
