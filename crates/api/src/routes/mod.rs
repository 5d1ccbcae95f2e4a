//! Route handlers

pub mod sites;
pub mod webhook;
