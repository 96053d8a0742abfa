mod date;
mod models;
mod symbol;

pub use date::TradingDate;
pub use models::{
    CorporateAction, EodBar, Exchange, ExchangeId, ExchangeRole, Security, SecurityId, VendorBar,
};
pub use symbol::Symbol;
