// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-level errors.
//!
//! Step handlers never surface errors here: they fold failures into
//! [`drip_core::Transition`] outcomes. This enum covers store access,
//! collaborator plumbing, and definition validation.

use drip_adapters::contacts::ContactStoreError;
use drip_adapters::templates::TemplateStoreError;
use drip_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("contact store error: {0}")]
    Contacts(#[from] ContactStoreError),
    #[error("template store error: {0}")]
    Templates(#[from] TemplateStoreError),
    #[error("invalid workflow definition: {0}")]
    Validation(String),
    #[error("invalid engine config: {0}")]
    Config(String),
}
