//! Application services that sit beside the record store.

pub mod analytics_service;

pub use analytics_service::AnalyticsService;
