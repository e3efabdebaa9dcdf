// Linear wizard / funnel controller.
// Flow definitions live in `crate::flows`; this module is flow-agnostic.

pub mod controller;
pub mod handlers;
pub mod persistence;
pub mod registry;
pub mod service;
pub mod session;
pub mod validation;
