use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One row of the map-name translation table.
///
/// `eng` is `None` for maps nobody has translated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapName {
    pub eng: Option<String>,
    pub kor: String,
}

impl MapName {
    pub fn new(eng: impl Into<String>, kor: impl Into<String>) -> Self {
        Self {
            eng: Some(eng.into()),
            kor: kor.into(),
        }
    }

    pub fn placeholder(kor: impl Into<String>) -> Self {
        Self {
            eng: None,
            kor: kor.into(),
        }
    }
}

/// Korean map name to English map name.
pub trait MapNameLookup {
    fn english_name(&self, korean: &str) -> Option<String>;
}

impl<F> MapNameLookup for F
where
    F: Fn(&str) -> Option<String>,
{
    fn english_name(&self, korean: &str) -> Option<String> {
        self(korean)
    }
}

/// Ordered translation table, usually loaded from the `eng,kor` map names CSV.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapNameTable {
    entries: Vec<MapName>,
}

impl MapNameTable {
    pub fn new(entries: Vec<MapName>) -> Self {
        Self { entries }
    }

    pub fn from_csv_path(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("open map names file {}", path.display()))?;
        Self::from_csv_reader(file)
            .with_context(|| format!("parse map names file {}", path.display()))
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries = Vec::new();
        for row in rdr.deserialize::<MapName>() {
            let mut entry = row.context("invalid map names row")?;
            entry.eng = entry.eng.filter(|eng| !eng.is_empty());
            entries.push(entry);
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[MapName] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl MapNameLookup for MapNameTable {
    fn english_name(&self, korean: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|entry| entry.kor == korean)
            .and_then(|entry| entry.eng.clone())
    }
}
