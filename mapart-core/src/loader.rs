use crate::constants::REQUIRED_CSV_COLUMNS;

use std::{ffi::OsStr, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::event;

/// One row of a locations file. Cells are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MapQuery {
    pub query: String,
    pub zoom: String,
    pub city: String,
    pub location_code: String,
    pub year: String,
    pub output_path: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not find {0}")]
    FileNotFound(String),
    #[error("File must have a .csv extension")]
    InvalidFileType,
    #[error("Missing required column \"{0}\"")]
    MissingField(&'static str),
    #[error("Failed to read locations file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed locations file: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads every row of the CSV file at `path` into a [MapQuery], in file
/// order.
///
/// # Errors
///
/// - [LoadError::FileNotFound] if `path` is not an existing file.
/// - [LoadError::InvalidFileType] if `path` does not end in `.csv`.
/// - [LoadError::MissingField] if the header lacks one of the six columns.
/// - [LoadError::Csv] if a row cannot be parsed.
pub fn read_locations_file(path: impl AsRef<Path>) -> Result<Vec<MapQuery>, LoadError> {
    let path = path.as_ref();

    if !path.is_file() {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        return Err(LoadError::FileNotFound(name));
    }

    if path.extension() != Some(OsStr::new("csv")) {
        return Err(LoadError::InvalidFileType);
    }

    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?;
    if let Some(missing) = REQUIRED_CSV_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|header| header == **column))
    {
        return Err(LoadError::MissingField(*missing));
    }

    let locations = reader
        .deserialize::<MapQuery>()
        .collect::<Result<Vec<_>, _>>()?;

    event!(
        tracing::Level::DEBUG,
        "Loaded {} map queries from {}",
        locations.len(),
        path.display()
    );

    Ok(locations)
}

#[cfg(test)]
mod test {
    use super::*;

    use std::fs;

    const HEADER: &str = "query,zoom,city,location_code,year,output_path";

    #[test]
    fn test_reads_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.csv");
        fs::write(
            &path,
            format!(
                "{HEADER}\n\
                 \"Old Town, Tallinn\",15,Tallinn,TLL,2024,out/tallinn.png\n\
                 Kreuzberg,14,Berlin,BER,1999,out/berlin.png\n\
                 Gracia,16,Barcelona,BCN,,\n"
            ),
        )
        .unwrap();

        let locations = read_locations_file(&path).unwrap();

        assert_eq!(locations.len(), 3);
        assert_eq!(
            locations[0],
            MapQuery {
                query: "Old Town, Tallinn".to_string(),
                zoom: "15".to_string(),
                city: "Tallinn".to_string(),
                location_code: "TLL".to_string(),
                year: "2024".to_string(),
                output_path: "out/tallinn.png".to_string(),
            }
        );
        assert_eq!(locations[1].city, "Berlin");
        assert_eq!(locations[2].query, "Gracia");
        assert_eq!(locations[2].year, "");
        assert_eq!(locations[2].output_path, "");
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        fs::write(&path, format!("{HEADER}\n")).unwrap();

        assert!(read_locations_file(&path).unwrap().is_empty());
    }

    #[test]
    fn test_columns_can_be_reordered_and_extended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shuffled.csv");
        fs::write(
            &path,
            "year,query,notes,output_path,zoom,location_code,city\n\
             2001,Alfama,ignored,a.png,15,LIS,Lisbon\n",
        )
        .unwrap();

        let locations = read_locations_file(&path).unwrap();

        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].query, "Alfama");
        assert_eq!(locations[0].year, "2001");
        assert_eq!(locations[0].city, "Lisbon");
    }

    #[test]
    fn test_missing_file_reports_its_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nowhere.csv");

        let error = read_locations_file(&path).unwrap_err();

        assert!(matches!(error, LoadError::FileNotFound(_)));
        assert!(error.to_string().contains("nowhere.csv"));
    }

    #[test]
    fn test_wrong_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("locations.txt");
        fs::write(&path, format!("{HEADER}\na,1,b,c,2000,d\n")).unwrap();

        let error = read_locations_file(&path).unwrap_err();

        assert!(matches!(error, LoadError::InvalidFileType));
    }

    #[test]
    fn test_missing_column_fails_before_reading_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.csv");
        fs::write(
            &path,
            "query,zoom,city,location_code,output_path\n\
             Alfama,15,Lisbon,LIS,a.png\n",
        )
        .unwrap();

        let error = read_locations_file(&path).unwrap_err();

        assert!(matches!(error, LoadError::MissingField("year")));
    }

    #[test]
    fn test_short_row_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.csv");
        fs::write(&path, format!("{HEADER}\nAlfama,15\n")).unwrap();

        let error = read_locations_file(&path).unwrap_err();

        assert!(matches!(error, LoadError::Csv(_)));
    }
}
