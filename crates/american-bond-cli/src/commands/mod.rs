pub mod bond;
pub mod rates;
