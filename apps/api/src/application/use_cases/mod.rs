pub mod account;
pub mod entitlement;
pub mod provisioning;
pub mod purchase;
pub mod session;
