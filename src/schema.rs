//! Row normalization.
//!
//! Sheets are edited by hand, so headers drift ("Tarea" vs "Detalle de lo que
//! debe realizarse", "Año" vs "Ano"). Each record kind declares a fixed rename
//! table; normalization maps whatever columns a row has onto canonical field
//! names and fills missing ones with "". Typed records are built only from
//! normalized rows.
//!
//! The cell parsers here never fail hard: they return `None` and the caller
//! picks the fallback.

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::storage::Row;

/// A canonical field and the sheet headers accepted for it.
///
/// The first alias is the header written when the sheet is created.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

impl Field {
    pub fn sheet_header(&self) -> &'static str {
        self.aliases.first().copied().unwrap_or(self.name)
    }

    fn accepts(&self, folded_header: &str) -> bool {
        fold(self.name) == folded_header
            || self
                .aliases
                .iter()
                .any(|alias| fold(alias) == folded_header)
    }
}

/// Fixed field set for one record kind
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    pub kind: &'static str,
    pub fields: &'static [Field],
}

pub const LINK_SCHEMA: RecordSchema = RecordSchema {
    kind: "link",
    fields: &[
        Field { name: "petal", aliases: &["Pétalo", "Petal"] },
        Field { name: "topic", aliases: &["Tema"] },
        Field { name: "detail", aliases: &["Detalle"] },
        Field { name: "kind", aliases: &["Tipo"] },
        Field { name: "created", aliases: &["Fecha", "Fecha de creación"] },
        Field { name: "year", aliases: &["Año"] },
        Field { name: "name", aliases: &["Nombre"] },
        Field { name: "description", aliases: &["Descripción"] },
        Field { name: "url", aliases: &["URL", "Enlace", "Link"] },
    ],
};

pub const TASK_SCHEMA: RecordSchema = RecordSchema {
    kind: "task",
    fields: &[
        Field { name: "topic", aliases: &["Tema", "Área de responsabilidad semanal"] },
        Field { name: "zone", aliases: &["Zona", "Elemento o espacio específico"] },
        Field { name: "description", aliases: &["Tarea", "Detalle de lo que debe realizarse"] },
    ],
};

/// Ledger columns, in the order rows are appended.
pub const EVENT_SCHEMA: RecordSchema = RecordSchema {
    kind: "task event",
    fields: &[
        Field { name: "timestamp", aliases: &["Fecha", "Marca temporal"] },
        Field { name: "person", aliases: &["Semanerx", "Nombre"] },
        Field { name: "topic", aliases: &["Tema"] },
        Field { name: "zone", aliases: &["Zona"] },
        Field { name: "description", aliases: &["Tarea"] },
        Field { name: "status", aliases: &["Realizada", "Estado"] },
        Field { name: "percent", aliases: &["Porcentaje", "Avance"] },
        Field { name: "notes", aliases: &["Observaciones", "Notas"] },
    ],
};

pub const AGREEMENT_SCHEMA: RecordSchema = RecordSchema {
    kind: "agreement",
    fields: &[
        Field { name: "topic", aliases: &["Tema"] },
        Field { name: "order", aliases: &["Orden", "Número de orden"] },
        Field { name: "text", aliases: &["Acuerdo"] },
    ],
};

pub const EXTERNAL_AGREEMENT_SCHEMA: RecordSchema = RecordSchema {
    kind: "external agreement",
    fields: &[
        Field { name: "kind", aliases: &["Acuerdo", "Tipo de acuerdo"] },
        Field { name: "aspect", aliases: &["Aspecto", "Aspecto específico"] },
        Field { name: "detail", aliases: &["Detalle", "Detalle del acuerdo"] },
    ],
};

/// A row with every canonical field present.
#[derive(Debug, Clone, Default)]
pub struct NormalizedRow {
    values: HashMap<&'static str, String>,
}

impl NormalizedRow {
    /// Trimmed cell text for a canonical field, "" when absent.
    pub fn get(&self, field: &str) -> &str {
        self.values.get(field).map(String::as_str).unwrap_or("")
    }

    /// Whether every field is blank.
    pub fn is_blank(&self) -> bool {
        self.values.values().all(|value| value.is_empty())
    }
}

impl RecordSchema {
    /// Headers to write when creating this sheet.
    pub fn sheet_header(&self) -> Vec<&'static str> {
        self.fields.iter().map(Field::sheet_header).collect()
    }

    /// Map a raw row onto canonical fields.
    pub fn normalize(&self, row: &Row) -> NormalizedRow {
        let folded: Vec<(String, &String)> =
            row.iter().map(|(column, value)| (fold(column), value)).collect();

        let values = self
            .fields
            .iter()
            .map(|field| {
                let value = folded
                    .iter()
                    .find(|(column, _)| field.accepts(column))
                    .map(|(_, value)| value.trim().to_string())
                    .unwrap_or_default();
                (field.name, value)
            })
            .collect();

        NormalizedRow { values }
    }

    /// Canonical fields that no column of `row` provides.
    pub fn missing_fields(&self, row: &Row) -> Vec<&'static str> {
        let columns: Vec<String> = row.keys().map(|column| fold(column)).collect();
        self.fields
            .iter()
            .filter(|field| !columns.iter().any(|column| field.accepts(column)))
            .map(|field| field.name)
            .collect()
    }

    /// Normalize a whole table, dropping rows with no content.
    pub fn normalize_rows(&self, table: &str, rows: &[Row]) -> Vec<NormalizedRow> {
        if let Some(first) = rows.first() {
            let missing = self.missing_fields(first);
            if !missing.is_empty() {
                tracing::warn!(table, kind = self.kind, ?missing, "columns missing, filling with blanks");
            }
        }

        rows.iter()
            .map(|row| self.normalize(row))
            .filter(|row| !row.is_blank())
            .collect()
    }
}

/// Case- and accent-insensitive form of a header.
pub fn fold(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .map(|ch| match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect()
}

/// Percent cell: "75", "75%", "75.4", "75,4". Fractions are dropped so only
/// a full 100 reads as done. Clamped to 0..=100.
pub fn parse_percent(raw: &str) -> Option<u8> {
    let cleaned = raw.trim().trim_end_matches('%').trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(value.trunc().clamp(0.0, 100.0) as u8)
}

/// Whole-number cell such as a year or an order, tolerating "2024.0".
pub fn parse_whole(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return Some(value);
    }
    let value: f64 = trimmed.parse().ok()?;
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];

/// Ledger timestamp cell. Bare dates land at midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }

    parse_numeric_date(trimmed).and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn parse_numeric_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

const MONTHS: &[(&str, u32)] = &[
    ("enero", 1),
    ("ene", 1),
    ("febrero", 2),
    ("feb", 2),
    ("marzo", 3),
    ("mar", 3),
    ("abril", 4),
    ("abr", 4),
    ("mayo", 5),
    ("may", 5),
    ("junio", 6),
    ("jun", 6),
    ("julio", 7),
    ("jul", 7),
    ("agosto", 8),
    ("ago", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("sept", 9),
    ("sep", 9),
    ("set", 9),
    ("octubre", 10),
    ("oct", 10),
    ("noviembre", 11),
    ("nov", 11),
    ("diciembre", 12),
    ("dic", 12),
];

fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, number)| *number)
}

/// Free-text Spanish date such as "15 de marzo de 2024" or "marzo 2024".
///
/// A missing day means the 1st, a missing year falls back to `year`.
/// Anything unreadable becomes January 1st of `year`, or `None` without one.
pub fn parse_spanish_date(raw: &str, year: Option<i32>) -> Option<NaiveDate> {
    let january_first = |y: i32| NaiveDate::from_ymd_opt(y, 1, 1);
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return year.and_then(january_first);
    }

    if let Some(date) = parse_numeric_date(trimmed) {
        return Some(date);
    }

    let folded = fold(trimmed);
    let mut day = None;
    let mut month = None;
    let mut text_year = None;
    for token in folded.split(|ch: char| !ch.is_alphanumeric()) {
        if token.is_empty() {
            continue;
        }
        if token.chars().all(|ch| ch.is_ascii_digit()) {
            let number: i32 = match token.parse() {
                Ok(number) => number,
                Err(_) => continue,
            };
            if token.len() == 4 {
                text_year.get_or_insert(number);
            } else if (1..=31).contains(&number) && day.is_none() {
                day = Some(number as u32);
            }
        } else if month.is_none() {
            month = month_number(token);
        }
    }

    let resolved_year = text_year.or(year);
    if let (Some(month), Some(y)) = (month, resolved_year) {
        if let Some(date) = NaiveDate::from_ymd_opt(y, month, day.unwrap_or(1)) {
            return Some(date);
        }
    }

    resolved_year.and_then(january_first)
}
