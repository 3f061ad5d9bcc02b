pub mod otc;
