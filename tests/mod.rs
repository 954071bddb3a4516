//! Test module organization.
//!
//! This module organizes all integration tests for the circuit simulator.


/// Chip construction from library descriptions.
mod builder_tests;


/// Toy CPU instruction execution tests.
mod cpu_tests;







/// End-to-end frame evaluation tests.
mod simulator_tests;
