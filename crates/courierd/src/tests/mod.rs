//! Test suites for the Courier daemon.

mod support;
