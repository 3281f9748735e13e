//! Recompiler configuration.
//!
//! Every knob here is an independent boolean, loaded from a TOML document and
//! overridable from the command line. Defaults match what an unconfigured
//! run needs: nothing shadowed into locals, both well-known jump addresses
//! unset (any call to address 0 is simply never matched).

use serde::{Deserialize, Serialize};

/// Boolean recompiler knobs plus the two well-known longjmp/setjmp addresses.
///
/// Fields are independent; the operand-name resolver in
/// [`crate::translator::operand_name`] only ever looks at the relevant
/// subset for a given register class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Elide writes to `ctx.lr`.
    pub skip_lr: bool,
    /// Elide writes to `ctx.msr`.
    pub skip_msr: bool,
    /// Shadow `ctx.ctr` into a local named `ctr`.
    pub ctr_as_local_variable: bool,
    /// Shadow `ctx.xer` into a local named `xer`.
    pub xer_as_local_variable: bool,
    /// Shadow the LL/SC reservation flag into a local named `reserved`.
    pub reserved_register_as_local_variable: bool,
    /// Shadow all eight CR fields into locals named `cr0..cr7`.
    pub cr_registers_as_local_variables: bool,
    /// Shadow scratch registers (r0, r2, r11, r12; f0; v32..v63) into locals.
    pub non_argument_registers_as_local_variables: bool,
    /// Shadow callee-saved registers (r14..r31; f14..f31; v14..v31, v64..v127).
    pub non_volatile_registers_as_local_variables: bool,
    /// Guest address of the `setjmp` trampoline, if the image has one.
    pub set_jmp_address: Option<u32>,
    /// Guest address of the `longjmp` trampoline, if the image has one.
    pub long_jmp_address: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            skip_lr: false,
            skip_msr: false,
            ctr_as_local_variable: false,
            xer_as_local_variable: false,
            reserved_register_as_local_variable: false,
            cr_registers_as_local_variables: false,
            non_argument_registers_as_local_variables: false,
            non_volatile_registers_as_local_variables: false,
            set_jmp_address: None,
            long_jmp_address: None,
        }
    }
}

impl Config {
    /// Parse a config document, falling back to defaults for absent fields.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Registers in `r0, r2, r11, r12` are the "non-argument" scratch class.
    pub fn is_non_argument_gpr(index: u8) -> bool {
        matches!(index, 0 | 2 | 11 | 12)
    }

    /// Registers `r14..=r31` are callee-saved ("non-volatile").
    pub fn is_non_volatile_gpr(index: u8) -> bool {
        (14..=31).contains(&index)
    }

    /// `f0` is the non-argument scratch FPR.
    pub fn is_non_argument_fpr(index: u8) -> bool {
        index == 0
    }

    /// `f14..=f31` are callee-saved FPRs.
    pub fn is_non_volatile_fpr(index: u8) -> bool {
        (14..=31).contains(&index)
    }

    /// `v32..=v63` are the non-argument scratch vector registers.
    pub fn is_non_argument_vmx(index: u8) -> bool {
        (32..=63).contains(&index)
    }

    /// `v14..=v31` and `v64..=v127` are callee-saved vector registers.
    pub fn is_non_volatile_vmx(index: u8) -> bool {
        (14..=31).contains(&index) || (64..=127).contains(&index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_shadow_nothing() {
        let config = Config::default();
        assert!(!config.ctr_as_local_variable);
        assert!(!config.cr_registers_as_local_variables);
        assert_eq!(config.set_jmp_address, None);
    }

    #[test]
    fn parses_partial_document() {
        let config = Config::from_toml_str("ctrAsLocalVariable = true\n").unwrap();
        assert!(config.ctr_as_local_variable);
        assert!(!config.xer_as_local_variable);
    }

    #[test]
    fn gpr_classes_are_disjoint_from_defaults() {
        assert!(Config::is_non_argument_gpr(0));
        assert!(Config::is_non_argument_gpr(12));
        assert!(!Config::is_non_argument_gpr(14));
        assert!(Config::is_non_volatile_gpr(14));
        assert!(Config::is_non_volatile_gpr(31));
        assert!(!Config::is_non_volatile_gpr(13));
    }
}
