//! Core resource model, synthesis and policy evaluation

pub mod app;
pub mod arn;
pub mod config;
pub mod error;
pub mod iam;
pub mod manifest;
pub mod stack;
pub mod storage;
pub mod synth;
pub mod tags;
pub mod validation;
