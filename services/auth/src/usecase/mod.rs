pub mod otc;
pub mod sweep;
