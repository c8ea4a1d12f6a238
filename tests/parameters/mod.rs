//! Integration tests for the parameter system
//!
//! These tests verify that the parameter system behaves correctly in various scenarios.

// Tests for priors and bounds
mod bounds_tests;

// Tests for the ParameterGraph views
mod graph_tests;
