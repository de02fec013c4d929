pub mod currency;
pub mod deal;
pub mod error;
pub mod ledger;
pub mod wallet;
