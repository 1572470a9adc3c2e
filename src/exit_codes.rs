/// Process exit codes of the `fileflow` binary.
pub mod exit {
    pub const SUCCESS: i32 = 0;
    /// A procedure failed while running (I/O error during discovery or cleaning).
    pub const OPERATIONAL_FAILURE: i32 = 1;
    /// The configuration could not be loaded, a procedure was rejected by its
    /// validator, or no handler exists for its kind.
    pub const VALIDATION_FAILURE: i32 = 2;
    /// Every procedure ran but some files were left unresolved.
    pub const UNRESOLVED_REMAINDER: i32 = 3;
}
