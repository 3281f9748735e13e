//! CSR (flush-mode) state tracking.
//!
//! The VMX denormals-flush mode is a two-state switch, but the tracked value
//! also needs an `Unknown` starting/join state so that the first FP or
//! vector op in a function, and the first one after any label or call,
//! always re-emits the mode switch.

/// Tracked flush-mode state across a linear emission pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CsrState {
    /// No assumption can be made; the next FP/VMX op must emit its switch.
    #[default]
    Unknown,
    /// Scalar FPU mode (flush-to-zero disabled) is active.
    Fpu,
    /// VMX mode (flush-to-zero enabled) is active.
    Vmx,
}

impl CsrState {
    /// Whether reaching `desired` from `self` requires emitting a mode
    /// switch. `Unknown` always requires one; otherwise only a class change
    /// does.
    pub fn needs_switch(self, desired: CsrState) -> bool {
        debug_assert_ne!(desired, CsrState::Unknown, "desired state must be concrete");
        self != desired
    }

    /// A label or call site invalidates any assumption about the current
    /// mode; both are join points with unknown predecessor state.
    pub fn reset(&mut self) {
        *self = CsrState::Unknown;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_always_needs_a_switch() {
        assert!(CsrState::Unknown.needs_switch(CsrState::Fpu));
        assert!(CsrState::Unknown.needs_switch(CsrState::Vmx));
    }

    #[test]
    fn same_class_does_not_need_a_switch() {
        assert!(!CsrState::Fpu.needs_switch(CsrState::Fpu));
        assert!(CsrState::Fpu.needs_switch(CsrState::Vmx));
    }

    #[test]
    fn reset_forces_unknown() {
        let mut state = CsrState::Vmx;
        state.reset();
        assert_eq!(state, CsrState::Unknown);
    }
}
