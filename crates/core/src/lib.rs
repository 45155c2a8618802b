pub mod account;
pub mod money;

pub use account::AccountType;
pub use money::Money;
