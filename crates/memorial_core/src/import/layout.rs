//! Column layouts for vertex import files.
//!
//! Layouts are chosen by the caller; nothing here sniffs a file to guess
//! its format. Each preset matches one export source seen in the field.

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Field separator of a line-oriented payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    Tab,
    Comma,
}

impl Delimiter {
    pub fn as_char(self) -> char {
        match self {
            Self::Tab => '\t',
            Self::Comma => ',',
        }
    }
}

/// Zero-based column positions of the vertex fields a layout maps.
///
/// `None` means the layout never carries the field; such fields are left
/// untouched on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct VertexColumns {
    pub from_label: usize,
    pub to_label: Option<usize>,
    pub distance: Option<usize>,
    pub utm_n: Option<usize>,
    pub utm_e: Option<usize>,
    pub latitude: Option<usize>,
    pub longitude: Option<usize>,
    pub confronting_text: Option<usize>,
    pub tax_id: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportLayout {
    pub delimiter: Delimiter,
    /// First non-blank line is a header and is skipped.
    pub has_header: bool,
    pub min_columns: usize,
    pub columns: VertexColumns,
    /// Whether a label with no matching vertex may create one.
    pub allows_create: bool,
}

impl ImportLayout {
    /// Splits a line into trimmed fields.
    pub fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        line.split(self.delimiter.as_char()).map(str::trim).collect()
    }

    /// Returns a mapped field, or `None` when the layout does not map it,
    /// the line is too short, or the field is blank.
    pub fn field<'a>(&self, fields: &[&'a str], column: Option<usize>) -> Option<&'a str> {
        column
            .and_then(|index| fields.get(index).copied())
            .filter(|value| !value.is_empty())
    }
}

/// Known vertex import formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportPreset {
    /// `label,E,N`, comma-delimited, no header; only refreshes UTM.
    UtmOnly,
    /// Tab-delimited with header: `from to azimuth distance N E [lat] [lon]`.
    Full,
    /// Tab-delimited CAD/LISP export with header:
    /// `from to azimuth distance E N lat lon`.
    LispExport,
    /// Tab-delimited, no header:
    /// `from to lon lat distance confronting [N E] [tax_id]`.
    VertexRecords,
}

impl ImportPreset {
    pub const ALL: [Self; 4] = [
        Self::UtmOnly,
        Self::Full,
        Self::LispExport,
        Self::VertexRecords,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::UtmOnly => "utm",
            Self::Full => "full",
            Self::LispExport => "lisp",
            Self::VertexRecords => "records",
        }
    }

    pub fn layout(self) -> ImportLayout {
        match self {
            Self::UtmOnly => ImportLayout {
                delimiter: Delimiter::Comma,
                has_header: false,
                min_columns: 3,
                columns: VertexColumns {
                    from_label: 0,
                    utm_e: Some(1),
                    utm_n: Some(2),
                    ..VertexColumns::default()
                },
                allows_create: false,
            },
            Self::Full => ImportLayout {
                delimiter: Delimiter::Tab,
                has_header: true,
                min_columns: 6,
                columns: VertexColumns {
                    from_label: 0,
                    to_label: Some(1),
                    distance: Some(3),
                    utm_n: Some(4),
                    utm_e: Some(5),
                    latitude: Some(6),
                    longitude: Some(7),
                    ..VertexColumns::default()
                },
                allows_create: true,
            },
            Self::LispExport => ImportLayout {
                delimiter: Delimiter::Tab,
                has_header: true,
                min_columns: 8,
                columns: VertexColumns {
                    from_label: 0,
                    to_label: Some(1),
                    distance: Some(3),
                    utm_e: Some(4),
                    utm_n: Some(5),
                    latitude: Some(6),
                    longitude: Some(7),
                    ..VertexColumns::default()
                },
                allows_create: true,
            },
            Self::VertexRecords => ImportLayout {
                delimiter: Delimiter::Tab,
                has_header: false,
                min_columns: 6,
                columns: VertexColumns {
                    from_label: 0,
                    to_label: Some(1),
                    longitude: Some(2),
                    latitude: Some(3),
                    distance: Some(4),
                    confronting_text: Some(5),
                    utm_n: Some(6),
                    utm_e: Some(7),
                    tax_id: Some(8),
                },
                allows_create: true,
            },
        }
    }
}

impl Display for ImportPreset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ImportPreset {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|preset| preset.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|preset| preset.name()).collect();
                format!("unknown import preset `{value}`; expected one of {}", names.join(", "))
            })
    }
}
