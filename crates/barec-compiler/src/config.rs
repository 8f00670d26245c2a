//! Generation options recognized by [`crate::compile`].

use serde::{Deserialize, Serialize};

/// Output flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Generator {
    /// Runtime values module with static types.
    Ts,
    /// Runtime values module only.
    Js,
    /// Type declarations only.
    Dts,
    /// Canonical re-serialization of the schema itself.
    Bare,
}

impl std::str::FromStr for Generator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ts" => Ok(Generator::Ts),
            "js" => Ok(Generator::Js),
            "dts" => Ok(Generator::Dts),
            "bare" => Ok(Generator::Bare),
            other => Err(format!(
                "unknown generator '{other}' (expected ts, js, dts, or bare)"
            )),
        }
    }
}

/// Compilation options. All toggles default to off; the zero value compiles
/// any valid schema into readonly, string-keyed, tagged-union TypeScript.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Output mode. `None` must be resolved (e.g. from the output file
    /// extension) before compiling; an unresolved mode is a config error.
    pub generator: Option<Generator>,
    /// Accept legacy top-level `enum Name {...}` / `struct Name {...}`
    /// declarations.
    pub legacy: bool,
    /// Require every enum value and union tag to be written out explicitly.
    pub pedantic: bool,
    /// Root aliases that receive `encode*`/`decode*` entry points.
    pub main: Vec<String>,
    /// Class representation for structs instead of plain records.
    pub use_class: bool,
    /// Flat wire representation for unions.
    pub use_flat_union: bool,
    /// Generic arrays even for fixed-width numeric elements.
    pub use_generic_array: bool,
    /// Integer-valued enums instead of string-keyed ones.
    pub use_int_enum: bool,
    /// Integer discriminators for flat struct unions instead of alias names.
    pub use_int_tag: bool,
    /// Generated writers accept both `null` and `undefined` as the absent
    /// optional value.
    pub use_lax_optional: bool,
    /// Mutable host collections instead of readonly ones.
    pub use_mutable: bool,
    /// `null` for the absent optional value instead of `undefined`.
    pub use_null: bool,
    /// Float-safe 64-bit integers (`number`) instead of native `bigint`.
    pub use_safe_int: bool,
}
