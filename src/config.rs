// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Configuration constants.

/// Width of an identity in bytes.
pub const IDENTITY_LEN: usize = 20;

/// Width of a digest in bytes.
pub const DIGEST_LEN: usize = 32;
