//! Setup for the application: configuration loading, logging and the
//! construction of the tracker and its jobs.
pub mod app;
pub mod jobs;
pub mod logging;
