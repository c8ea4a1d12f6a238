//! Integration tests for the Objective
//!
//! These tests check the parameter vector contracts, the probability terms,
//! covariance estimation and posterior draws of an objective.

// Parameter vectors and probability terms
mod objective_tests;

// Covariance and standard errors
mod covariance_tests;
