//! Request middleware for the Restaurant POS Platform

pub mod auth;

pub use auth::{auth_middleware, check_permission, AuthUser, CurrentUser};
