pub mod credential_authority;
pub mod receipt_verifier;
