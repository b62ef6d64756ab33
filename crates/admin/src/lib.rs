//! Dazzle Admin library.
//!
//! The admin console for the Dazzle catalog: a server-rendered axum app over
//! the hosted `PostgreSQL` backend and its auth service.
//!
//! # Access
//!
//! Every page except sign-in and registration requires a principal holding the
//! `admin` role grant. Grants are created only by approving an admin request
//! (or, once, by `dazzle-cli requests bootstrap`).

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;
