use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DataKeys;
use crate::decoder::{decode, DecodeProfile};
use crate::error::{Result, TransformError};
use crate::table::{Cell, Column, TabularDataset};

pub const DOCUMENTATION_LINK: &str = "Documentation Link";
const HYPERLINK_PREFIX: &str = "=HYPERLINK";
const CONTACT_RENAMES: [(&str, &str); 2] = [
    ("Account Name", "Partner"),
    ("Account Owner", "Partner Manager"),
];

pub fn contact_rename(mut dataset: TabularDataset) -> TabularDataset {
    for (from, to) in CONTACT_RENAMES {
        if dataset.rename_column(from, to) {
            debug!(from, to, "renamed column");
        }
    }
    dataset
}

pub fn rolodex_hyperlink_split(
    mut dataset: TabularDataset,
) -> std::result::Result<TabularDataset, TransformError> {
    let first = dataset.column_at(0).ok_or(TransformError::NoColumns)?;
    if dataset.column(DOCUMENTATION_LINK).is_some() {
        return Err(TransformError::DuplicateColumn(
            DOCUMENTATION_LINK.to_string(),
        ));
    }
    let links = first
        .cells
        .iter()
        .map(|cell| Cell::Text(extract_link(cell)))
        .collect();
    dataset.insert_column(1, Column::new(DOCUMENTATION_LINK, links))?;
    dataset.map_column(0, |cell| match cell {
        Cell::Text(text) => Cell::Text(extract_label(&text).unwrap_or(text)),
        missing => missing,
    })?;
    Ok(dataset)
}

pub fn extract_link(cell: &Cell) -> String {
    cell.as_str().and_then(first_quoted).unwrap_or_default()
}

pub fn extract_label(text: &str) -> Option<String> {
    let prefix = text.get(..HYPERLINK_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(HYPERLINK_PREFIX) {
        return None;
    }
    let separator = if text.contains(';') { ';' } else { ',' };
    let (_, rest) = text.split_once(separator)?;
    first_quoted(rest)
}

fn first_quoted(text: &str) -> Option<String> {
    let start = text.find('"')? + 1;
    let len = text[start..].find('"')?;
    Some(text[start..start + len].trim().to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Contacts,
    Rolodex,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Contacts, DatasetKind::Rolodex];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Contacts => "contacts",
            DatasetKind::Rolodex => "rolodex",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "contacts" | "partnercontacts" => Some(DatasetKind::Contacts),
            "rolodex" => Some(DatasetKind::Rolodex),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::Contacts => "Partner Contacts",
            DatasetKind::Rolodex => "Rolodex",
        }
    }

    pub fn profile(&self) -> DecodeProfile {
        match self {
            DatasetKind::Contacts => DecodeProfile::comma(),
            DatasetKind::Rolodex => DecodeProfile::tab(),
        }
    }

    pub fn destination_key<'a>(&self, keys: &'a DataKeys) -> &'a str {
        match self {
            DatasetKind::Contacts => &keys.contacts,
            DatasetKind::Rolodex => &keys.rolodex,
        }
    }

    pub fn apply(
        &self,
        dataset: TabularDataset,
    ) -> std::result::Result<TabularDataset, TransformError> {
        match self {
            DatasetKind::Contacts => Ok(contact_rename(dataset)),
            DatasetKind::Rolodex => rolodex_hyperlink_split(dataset),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PreparedUpload {
    pub kind: DatasetKind,
    pub csv: Vec<u8>,
    pub rows: usize,
    pub columns: Vec<String>,
}

pub fn prepare(kind: DatasetKind, bytes: &[u8]) -> Result<PreparedUpload> {
    let dataset = decode(bytes, &kind.profile())?;
    let dataset = kind.apply(dataset)?;
    let csv = dataset.to_csv_bytes()?;
    info!(
        kind = kind.as_str(),
        rows = dataset.row_count(),
        bytes = csv.len(),
        "transformed upload"
    );
    Ok(PreparedUpload {
        kind,
        rows: dataset.row_count(),
        columns: dataset
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect(),
        csv,
    })
}
