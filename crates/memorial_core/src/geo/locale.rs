//! Brazilian (pt-BR) presentation of numbers and dates.

use chrono::{Datelike, NaiveDate};

const MONTHS_PT: [&str; 12] = [
    "Janeiro",
    "Fevereiro",
    "Março",
    "Abril",
    "Maio",
    "Junho",
    "Julho",
    "Agosto",
    "Setembro",
    "Outubro",
    "Novembro",
    "Dezembro",
];

/// Fixed-point rendering with a decimal comma and no thousands grouping.
pub fn format_br(value: f64, places: usize) -> String {
    format!("{value:.places$}").replace('.', ",")
}

/// Distances, areas and perimeters: two decimal places.
pub fn format_br_measure(value: f64) -> String {
    format_br(value, 2)
}

/// UTM coordinates: three decimal places; a missing value prints `0,000`.
pub fn format_br_coord(value: Option<f64>) -> String {
    format_br(value.unwrap_or(0.0), 3)
}

/// Long-form date, e.g. `5 de Março de 2025`.
pub fn format_long_date_pt(date: NaiveDate) -> String {
    let month = MONTHS_PT[date.month0() as usize];
    format!("{} de {} de {}", date.day(), month, date.year())
}
