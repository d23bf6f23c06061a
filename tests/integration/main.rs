//! Integration tests over the public crate API.

mod dashboard_api;
mod round_flow;
