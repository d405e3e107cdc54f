// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Membership oracle seam.
//!
//! The registry never decides who is a member. It asks an injected
//! [`MembershipOracle`] on every write path, inside the write's critical
//! section, and consumes the answer immediately.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::sync::Arc;
use serde::{Deserialize, Serialize};

use crate::types::id::Identity;

/// The external membership authority.
///
/// Implementations must be synchronous and side-effect free from the
/// registry's point of view.
pub trait MembershipOracle {
    /// Personal token of a registered user, `None` if the identity has none.
    fn token_of(&self, identity: &Identity) -> Option<Identity>;

    /// Whether the identity is a registered organization.
    fn is_organization(&self, identity: &Identity) -> bool;
}

/// User with a non-null token, or organization. Token lookup goes first and
/// the organization lookup only runs when it is negative.
///
/// A token equal to [`Identity::ZERO`] is the null token.
pub fn is_recognized_member<O: MembershipOracle + ?Sized>(oracle: &O, identity: &Identity) -> bool {
    if oracle.token_of(identity).map_or(false, |token| !token.is_zero()) {
        return true;
    }
    oracle.is_organization(identity)
}

impl<O: MembershipOracle + ?Sized> MembershipOracle for &O {
    fn token_of(&self, identity: &Identity) -> Option<Identity> {
        (**self).token_of(identity)
    }

    fn is_organization(&self, identity: &Identity) -> bool {
        (**self).is_organization(identity)
    }
}

impl<O: MembershipOracle + ?Sized> MembershipOracle for Box<O> {
    fn token_of(&self, identity: &Identity) -> Option<Identity> {
        (**self).token_of(identity)
    }

    fn is_organization(&self, identity: &Identity) -> bool {
        (**self).is_organization(identity)
    }
}

impl<O: MembershipOracle + ?Sized> MembershipOracle for Arc<O> {
    fn token_of(&self, identity: &Identity) -> Option<Identity> {
        (**self).token_of(identity)
    }

    fn is_organization(&self, identity: &Identity) -> bool {
        (**self).is_organization(identity)
    }
}

/// In-memory membership table.
///
/// Serves as the test double and as the node's file-backed adapter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMembership {
    #[serde(default)]
    pub users: BTreeMap<Identity, Identity>,
    #[serde(default)]
    pub organizations: BTreeSet<Identity>,
}

impl StaticMembership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, identity: Identity, token: Identity) -> Self {
        self.users.insert(identity, token);
        self
    }

    pub fn with_organization(mut self, identity: Identity) -> Self {
        self.organizations.insert(identity);
        self
    }

    pub fn len(&self) -> usize {
        self.users.len() + self.organizations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty() && self.organizations.is_empty()
    }
}

impl MembershipOracle for StaticMembership {
    fn token_of(&self, identity: &Identity) -> Option<Identity> {
        self.users.get(identity).copied()
    }

    fn is_organization(&self, identity: &Identity) -> bool {
        self.organizations.contains(identity)
    }
}
