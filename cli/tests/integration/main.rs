//! Integration tests for the dotd CLI
//!
//! These tests spawn the actual binary and test end-to-end behavior that
//! does not need a cloud account.

mod settings_errors;
