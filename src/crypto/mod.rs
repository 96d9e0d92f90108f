// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Cardledger Authors

//! # Card Number Confidentiality
//!
//! Two layers, applied at different boundaries:
//!
//! - [`cipher`] — reversible, deterministic encryption for storage. Applied
//!   on every write; the clear number never reaches a table or a log.
//! - [`masker`] — irreversible display masking. Applied on every read, after
//!   decryption, at the response boundary.

pub mod cipher;
pub mod masker;

pub use cipher::{CardNumberCipher, CipherError};
pub use masker::mask_card_number;
