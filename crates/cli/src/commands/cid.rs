use anyhow::anyhow;
use avatar_kernel::encoding::cid::{from_cid_v0, to_cid_v0};
use avatar_kernel::types::digest::Digest;

pub fn digest_to_cid(hex_digest: &str) -> anyhow::Result<String> {
    let digest: Digest = hex_digest
        .parse()
        .map_err(|e| anyhow!("invalid digest {:?}: {}", hex_digest, e))?;
    Ok(to_cid_v0(&digest))
}

pub fn cid_to_digest(cid: &str) -> anyhow::Result<String> {
    let digest = from_cid_v0(cid).map_err(|e| anyhow!("invalid CIDv0 {:?}: {}", cid, e))?;
    Ok(digest.to_hex())
}
