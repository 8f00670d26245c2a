use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};

use barec_compiler::{Config, Generator};

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum ColorChoice {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    pub fn should_colorize(self) -> bool {
        match self {
            ColorChoice::Always => true,
            ColorChoice::Never => false,
            ColorChoice::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum GeneratorChoice {
    Ts,
    Js,
    Dts,
    Bare,
}

impl From<GeneratorChoice> for Generator {
    fn from(choice: GeneratorChoice) -> Self {
        match choice {
            GeneratorChoice::Ts => Generator::Ts,
            GeneratorChoice::Js => Generator::Js,
            GeneratorChoice::Dts => Generator::Dts,
            GeneratorChoice::Bare => Generator::Bare,
        }
    }
}

#[derive(Parser)]
#[command(name = "barec", bin_name = "barec")]
#[command(about = "Compile BARE schemas to TypeScript or JavaScript codecs")]
#[command(after_help = r#"EXAMPLES:
  barec schema.bare -o schema.ts
  barec schema.bare -o schema.js --main Message
  barec schema.bare --generator dts
  cat schema.bare | barec --generator ts"#)]
pub struct Cli {
    /// Schema file (stdin when absent or "-")
    #[arg(value_name = "SCHEMA")]
    pub schema: Option<PathBuf>,

    /// Output file (stdout when absent)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub out: Option<PathBuf>,

    /// Output format (inferred from the output extension when omitted)
    #[arg(long, value_name = "FORMAT")]
    pub generator: Option<GeneratorChoice>,

    /// JSON config file; command-line flags take precedence
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Colorize diagnostics (auto-detected by default)
    #[arg(long, default_value = "auto", value_name = "WHEN")]
    pub color: ColorChoice,

    /// Accept legacy 'enum Name {...}' and 'struct Name {...}' declarations
    #[arg(long)]
    pub legacy: bool,

    /// Require explicit enum values and union tags
    #[arg(long)]
    pub pedantic: bool,

    /// Root aliases to emit encode/decode helpers for (comma-separated)
    #[arg(long, value_name = "ALIASES", value_delimiter = ',')]
    pub main: Vec<String>,

    /// Generate classes instead of interfaces for structs
    #[arg(long)]
    pub use_class: bool,

    /// Generate flat unions instead of tagged unions
    #[arg(long)]
    pub use_flat_union: bool,

    /// Use generic arrays instead of typed arrays
    #[arg(long)]
    pub use_generic_array: bool,

    /// Use integers for enum values instead of member names
    #[arg(long)]
    pub use_int_enum: bool,

    /// Inject integer discriminators instead of string ones
    #[arg(long)]
    pub use_int_tag: bool,

    /// Accept null or undefined for optionals
    #[arg(long)]
    pub use_lax_optional: bool,

    /// Generate mutable arrays, sets, and maps
    #[arg(long)]
    pub use_mutable: bool,

    /// Use null instead of undefined for absent optionals
    #[arg(long)]
    pub use_null: bool,

    /// Use safe number types for 64-bit integers instead of bigint
    #[arg(long)]
    pub use_safe_int: bool,
}

impl Cli {
    /// Overlay command-line flags on a base config (defaults or a loaded
    /// config file). Boolean flags only ever switch options on.
    pub fn apply(&self, base: Config) -> Config {
        Config {
            generator: self
                .generator
                .map(Generator::from)
                .or_else(|| self.out.as_deref().and_then(infer_generator))
                .or(base.generator),
            legacy: base.legacy || self.legacy,
            pedantic: base.pedantic || self.pedantic,
            main: if self.main.is_empty() {
                base.main
            } else {
                self.main.clone()
            },
            use_class: base.use_class || self.use_class,
            use_flat_union: base.use_flat_union || self.use_flat_union,
            use_generic_array: base.use_generic_array || self.use_generic_array,
            use_int_enum: base.use_int_enum || self.use_int_enum,
            use_int_tag: base.use_int_tag || self.use_int_tag,
            use_lax_optional: base.use_lax_optional || self.use_lax_optional,
            use_mutable: base.use_mutable || self.use_mutable,
            use_null: base.use_null || self.use_null,
            use_safe_int: base.use_safe_int || self.use_safe_int,
        }
    }
}

/// `.d.ts` must win over `.ts`, so the full name is checked first.
pub fn infer_generator(out: &Path) -> Option<Generator> {
    let name = out.file_name()?.to_str()?;
    if name.ends_with(".d.ts") {
        return Some(Generator::Dts);
    }
    match out.extension()?.to_str()? {
        "ts" => Some(Generator::Ts),
        "js" | "mjs" | "cjs" => Some(Generator::Js),
        "bare" => Some(Generator::Bare),
        _ => None,
    }
}
