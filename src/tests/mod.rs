
use crate::membership::StaticMembership;
use crate::types::digest::Digest;
use crate::types::id::Identity;

pub(crate) const SEEDER: Identity = Identity([0x5e; 20]);
pub(crate) const USER: Identity = Identity([0x01; 20]);
pub(crate) const ORG: Identity = Identity([0x02; 20]);
pub(crate) const STRANGER: Identity = Identity([0x03; 20]);

pub(crate) fn digest(b: u8) -> Digest {
    Digest([b; 32])
}

/// USER has a token, ORG is an organization, STRANGER is neither.
pub(crate) fn oracle() -> StaticMembership {
    StaticMembership::new()
        .with_user(USER, Identity([0x11; 20]))
        .with_organization(ORG)
}
