//! Multi-tenant request routing: host resolution, per-tenant database binding,
//! module gating and tenant provisioning.

pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod services;
pub mod tenancy;

#[cfg(test)]
pub mod testing;
