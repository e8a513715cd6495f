use std::path::Path;

use fitsio::FitsFile;
use fitsio::hdu::{FitsHdu, HduInfo};

use crate::errors::{Error, Result};
use crate::table::{Cell, RawTable, cell};

/// Extensions scanned for a table before giving up.
const MAX_HDUS: usize = 16;

/// Read the first table HDU of a FITS file.
///
/// Every column is read as text; numeric columns that cfitsio refuses to
/// format are read as `f64` and printed.
pub fn read_fits(path: &Path) -> Result<RawTable> {
    let mut fptr = FitsFile::open(path).map_err(|e| Error::read(path, e))?;

    let mut found = None;
    for idx in 1..MAX_HDUS {
        let Ok(hdu) = fptr.hdu(idx) else { break };
        if let HduInfo::TableInfo {
            column_descriptions,
            num_rows,
        } = &hdu.info
        {
            let names: Vec<String> = column_descriptions.iter().map(|c| c.name.clone()).collect();
            found = Some((names, *num_rows, hdu));
            break;
        }
    }
    let (names, num_rows, hdu) =
        found.ok_or_else(|| Error::read(path, "no table extension found"))?;

    let mut columns = Vec::with_capacity(names.len());
    for name in &names {
        columns.push(read_column(&hdu, &mut fptr, name).map_err(|e| Error::read(path, e))?);
    }

    let mut table = RawTable::new(names);
    for row in 0..num_rows {
        let cells = columns
            .iter()
            .map(|col| col.get(row).cloned().flatten())
            .collect();
        table.push_row(cells).map_err(|e| Error::read(path, e))?;
    }
    Ok(table)
}

fn read_column(
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
    name: &str,
) -> fitsio::errors::Result<Vec<Cell>> {
    match hdu.read_col::<String>(fptr, name) {
        Ok(values) => Ok(values.iter().map(|v| cell(v)).collect()),
        Err(_) => {
            let values: Vec<f64> = hdu.read_col(fptr, name)?;
            Ok(values
                .into_iter()
                .map(|v| (!v.is_nan()).then(|| v.to_string()))
                .collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fitsio::tables::{ColumnDataType, ColumnDescription};
    use tempfile::TempDir;

    #[test]
    fn reads_first_table_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("targets.fits");
        {
            let mut f = FitsFile::create(&path).open().unwrap();
            let name = ColumnDescription::new("NAME")
                .with_type(ColumnDataType::String)
                .that_repeats(8)
                .create()
                .unwrap();
            let ra = ColumnDescription::new("RA")
                .with_type(ColumnDataType::Double)
                .create()
                .unwrap();
            let hdu = f.create_table("TARGETS", &[name, ra]).unwrap();
            hdu.write_col(&mut f, "NAME", &["T1".to_string(), "T2".to_string()])
                .unwrap();
            hdu.write_col(&mut f, "RA", &[10.5_f64, 279.25]).unwrap();
        }

        let t = read_fits(&path).unwrap();
        assert_eq!(t.headers(), ["NAME", "RA"]);
        assert_eq!(t.len(), 2);
        assert_eq!(t.rows()[1][0].as_deref(), Some("T2"));
        let ra: f64 = t.rows()[1][1].as_deref().unwrap().parse().unwrap();
        assert_eq!(ra, 279.25);
    }

    #[test]
    fn image_only_file_has_no_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("image.fits");
        FitsFile::create(&path).open().unwrap();

        let err = read_fits(&path).unwrap_err();
        assert!(err.to_string().contains("no table extension"));
    }
}
