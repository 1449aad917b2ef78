pub mod batch;
pub mod controller;
pub mod events;
pub mod job;
pub mod policy;
pub mod report;
pub mod scoring;
