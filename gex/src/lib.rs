#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_extern_crates,
    clippy::unused_self,
    missing_debug_implementations,
    rust_2018_idioms
)]

//! # Gex
//! Options gamma exposure (GEX) surfaces for a markets dashboard.
//!
//! A surface is built from a live options chain when one is available, and otherwise from a
//! deterministic synthetic model so the dashboard always has something plausible to render.
//!
//! ## Overview
//! * [`synthetic`]: seeded synthetic surface, a pure function of `(ticker, spot, expiration)`.
//! * [`chain`]: surface from a live options chain.
//! * [`service::GammaService`]: cache, quote and chain lookups with fallbacks at each step.
//! * [`source`]: [`source::QuoteSource`] and [`source::OptionsChainSource`] seams, plus the
//!   Yahoo Finance implementation.
//!
//! ## Examples
//! ```rust
//! use gex::{model::Ticker, seed::SeedMode, synthetic::generate_gamma_surface};
//!
//! let ticker = Ticker::new("spy").unwrap();
//! let surface = generate_gamma_surface(&ticker, 600.0, "2026-03-20", SeedMode::Sine);
//!
//! assert_eq!(surface.strikes.len(), 31);
//! assert_eq!(surface.strikes[15].strike, 600.0);
//! assert!(surface.gamma_flip >= 588.0 && surface.gamma_flip <= 612.0);
//! ```

/// Derived views: cumulative profile, notional, regime and trading signal.
pub mod analytics;

/// Time-boxed surface cache keyed by `(ticker, expiration)`.
pub mod cache;

/// Surface from a live options chain.
pub mod chain;

/// Environment-driven [`config::Config`].
pub mod config;

/// All [`Error`](std::error::Error)s generated in Gex.
pub mod error;

/// Weekly expiration calendar.
pub mod expiry;

/// Static spot price table used when no live quote is available.
pub mod fallback;

/// Core [`model::StrikeLevel`] and [`model::GammaSurface`] types.
pub mod model;

/// Response payload returned to the dashboard.
pub mod report;

/// Seeded pseudo-randomness from string hashing.
pub mod seed;

/// Request flow from ticker to [`report::GammaReport`], with fallbacks.
pub mod service;

/// Upstream market data sources.
pub mod source;

/// Deterministic synthetic surface used when no live chain is available.
pub mod synthetic;
