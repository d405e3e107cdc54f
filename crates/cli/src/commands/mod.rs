pub mod cid;
pub mod inspect;
pub mod timeline;
pub mod verify;
