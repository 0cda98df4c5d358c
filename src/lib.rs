// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Sealed Request Server - zero-knowledge privacy request intake
//!
//! Data subjects confirm their identity through a mock PIX charge and a CPF
//! check, then submit a privacy request that is sealed to the company's
//! public key before it is stored. The server only ever holds ciphertext
//! and non-sensitive metadata; decryption happens where the company keeps
//! its private key.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `company` - Company key generation, backup and registration
//! - `crypto` - Sealed box, authenticated box and key handling
//! - `identity` - CPF validation, mock PIX and the verification gate
//! - `pipeline` - Request sealing and company-side reveal
//! - `storage` - Opaque storage adapter (filesystem or in-memory)
//! - `sweeper` - Background pruning of verification attempts

pub mod api;
pub mod company;
pub mod config;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod sweeper;
