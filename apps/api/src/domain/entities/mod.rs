pub mod account;
pub mod entitlement_record;
pub mod product;
pub mod receipt_provider;
