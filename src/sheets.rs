use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, anyhow};
use calamine::{Data, Range, Reader, Xlsx, open_workbook};

/// One row of the data sheet. `provision`/`provision_specialty` are the join
/// keys against the provision reference sheet; blank cells stay `None`.
#[derive(Debug, Clone)]
pub struct DataRecord {
    pub code: Option<String>,
    pub provider_provision: String,
    pub provider_provision_specialty: String,
    pub provision: Option<String>,
    pub provision_specialty: Option<String>,
}

/// One row of the provision reference sheet. The source columns are `name`
/// and `specialty`; they are renamed on load to match the data sheet's join
/// keys.
#[derive(Debug, Clone)]
pub struct ProvisionRecord {
    pub provision: Option<String>,
    pub provision_specialty: Option<String>,
}

pub fn load_data_records(path: &Path) -> anyhow::Result<Vec<DataRecord>> {
    let range = first_sheet(path)?;
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| anyhow!("{} has no header row", path.display()))?;
    let columns = HeaderIndex::new(header);

    let code = columns.require("code", path)?;
    let provider_provision = columns.require("provider_provision", path)?;
    let provider_specialty = columns.require("provider_provision_specialty", path)?;
    let provision = columns.require("provision", path)?;
    let provision_specialty = columns.require("provision_specialty", path)?;

    let mut out = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        out.push(DataRecord {
            code: cell_at(row, code),
            provider_provision: cell_at(row, provider_provision).unwrap_or_default(),
            provider_provision_specialty: cell_at(row, provider_specialty).unwrap_or_default(),
            provision: cell_at(row, provision),
            provision_specialty: cell_at(row, provision_specialty),
        });
    }
    Ok(out)
}

pub fn load_provision_records(path: &Path) -> anyhow::Result<Vec<ProvisionRecord>> {
    let range = first_sheet(path)?;
    let mut rows = range.rows();
    let header = rows
        .next()
        .ok_or_else(|| anyhow!("{} has no header row", path.display()))?;
    let columns = HeaderIndex::new(header);

    let name = columns.require("name", path)?;
    let specialty = columns.require("specialty", path)?;

    let mut out = Vec::new();
    for row in rows {
        if row.iter().all(|c| matches!(c, Data::Empty)) {
            continue;
        }
        out.push(ProvisionRecord {
            provision: cell_at(row, name),
            provision_specialty: cell_at(row, specialty),
        });
    }
    Ok(out)
}

fn first_sheet(path: &Path) -> anyhow::Result<Range<Data>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path).with_context(|| format!("open {}", path.display()))?;
    workbook
        .worksheet_range_at(0)
        .ok_or_else(|| anyhow!("{} has no sheets", path.display()))?
        .with_context(|| format!("read first sheet of {}", path.display()))
}

struct HeaderIndex(HashMap<String, usize>);

impl HeaderIndex {
    fn new(row: &[Data]) -> Self {
        let mut map = HashMap::new();
        for (i, cell) in row.iter().enumerate() {
            if let Some(name) = cell_string(cell) {
                map.entry(name.to_ascii_lowercase()).or_insert(i);
            }
        }
        Self(map)
    }

    fn require(&self, name: &str, path: &Path) -> anyhow::Result<usize> {
        self.0.get(name).copied().ok_or_else(|| {
            anyhow!("{} is missing required column {:?}", path.display(), name)
        })
    }
}

fn cell_at(row: &[Data], index: usize) -> Option<String> {
    row.get(index).and_then(cell_string)
}

/// Numeric cells coerce through `Display`, which renders fraction-free floats
/// without a trailing `.0` (xlsx stores `101` as `101.0`).
fn cell_string(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_cells_coerce_to_integer_strings() {
        assert_eq!(cell_string(&Data::Float(101.0)), Some("101".to_string()));
        assert_eq!(cell_string(&Data::Float(101.5)), Some("101.5".to_string()));
        assert_eq!(cell_string(&Data::Int(7)), Some("7".to_string()));
    }

    #[test]
    fn blank_cells_are_none() {
        assert_eq!(cell_string(&Data::Empty), None);
        assert_eq!(cell_string(&Data::String("   ".to_string())), None);
    }

    #[test]
    fn string_cells_are_trimmed() {
        assert_eq!(
            cell_string(&Data::String("  Consulta ".to_string())),
            Some("Consulta".to_string())
        );
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let header = vec![
            Data::String("Code".to_string()),
            Data::String("provider_provision".to_string()),
        ];
        let columns = HeaderIndex::new(&header);
        let path = Path::new("data.xlsx");
        assert_eq!(columns.require("code", path).unwrap(), 0);
        assert_eq!(columns.require("provider_provision", path).unwrap(), 1);
        assert!(columns.require("missing", path).is_err());
    }
}
