//! Integration tests for the fgsweep library and binary.
//!
//! These tests drive whole sweeps over small synthetic inputs and check the outputs, the
//! incremental results file, and resumption behavior across runs.

mod helpers;
mod test_cli;
mod test_error_paths;
mod test_outputs;
mod test_resume;
mod test_sweep;
