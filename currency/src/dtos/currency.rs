use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    pub base: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub amount: f64,
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub result: f64,
}
