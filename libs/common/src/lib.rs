//! Common library for the Noter application
//!
//! This crate provides shared functionality used by the Noter services:
//! configuration, database connectivity, domain models and their
//! repositories, token handling, request authorization, attachment storage
//! and input validation.
//!
//! ```rust,no_run
//! use common::database::{init_pool, health_check, migrate};
//! use common::settings::Settings;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::new()?;
//!     let pool = init_pool(&settings.database_config()).await?;
//!     migrate(&pool).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod settings;
pub mod storage;
pub mod validation;
