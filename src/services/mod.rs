//! Pipeline stages and the collaborators they talk to.

pub mod identity;
pub mod media_probe;
pub mod object_storage;
pub mod remux;
pub mod upload_service;
pub mod url_resolver;
pub mod video_store;
