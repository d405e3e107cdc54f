// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Text renderings of digests. Pure and stateless.

pub mod base58;
pub mod cid;
