//! Scenario tests for the console core
//!
//! These exercise the session manager, refresh scheduler and API client
//! together across module boundaries; unit tests live next to the code
//! they cover.

mod helpers;

mod http_transport_test;
