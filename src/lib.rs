//! Duplicate-content gate for generated sites.
//!
//! Two detectors share one loaded [`corpus::Corpus`]:
//!
//! - [`sentences::find_repeats`] flags sentences repeated inside a page or
//!   shared between pages.
//! - [`similarity::find_similar`] flags page pairs whose TF-IDF cosine
//!   similarity ([`terms::TermIndex`]) meets a threshold.
//!
//! Both return [`report::AuditFinding`]s that an [`report::AuditReport`]
//! turns into a pass/fail verdict and a process exit code.

pub mod config;
pub mod corpus;
pub mod report;
pub mod sentences;
pub mod similarity;
pub mod terms;
