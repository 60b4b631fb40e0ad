//! HTTP request handlers.
//!
//! This module contains all the endpoint handlers for the device binding.

pub mod button;
pub mod health;
pub mod observe;
pub mod resource;
pub mod status;
