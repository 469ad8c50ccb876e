mod credential_issuer;

pub use credential_issuer::*;
