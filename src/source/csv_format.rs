//! Tabular beat file parsing
//!
//! Each row is one beat: `samples_per_beat` numeric columns followed by one
//! label column holding the beat class as a float (`0.0`, `2.0`, ...). The
//! file has no header row.

use std::io::Read;
use std::path::Path;

use super::dataset::{Beat, Dataset};
use super::AcquisitionError;

/// Parse a beat table from any reader
pub fn parse_beats<R: Read>(reader: R, samples_per_beat: usize) -> Result<Dataset, AcquisitionError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let expected_columns = samples_per_beat + 1;
    let mut beats = Vec::new();

    for (index, record) in csv_reader.records().enumerate() {
        let row = index + 1;
        let record = record.map_err(|e| AcquisitionError::Parse {
            row,
            reason: e.to_string(),
        })?;

        if record.len() != expected_columns {
            return Err(AcquisitionError::Parse {
                row,
                reason: format!("expected {} columns, found {}", expected_columns, record.len()),
            });
        }

        let mut samples = Vec::with_capacity(samples_per_beat);
        for (column, field) in record.iter().take(samples_per_beat).enumerate() {
            samples.push(parse_value(field, row, column)?);
        }

        let label = parse_label(&record[samples_per_beat], row)?;
        beats.push(Beat::with_label(samples, label));
    }

    Dataset::new(beats)
}

/// Parse a beat table from a file on disk
pub fn parse_beats_file(path: &Path, samples_per_beat: usize) -> Result<Dataset, AcquisitionError> {
    let file = std::fs::File::open(path).map_err(|e| AcquisitionError::Io(format!("{}: {}", path.display(), e)))?;
    parse_beats(std::io::BufReader::new(file), samples_per_beat)
}

fn parse_value(field: &str, row: usize, column: usize) -> Result<f64, AcquisitionError> {
    let value: f64 = field.parse().map_err(|_| AcquisitionError::Parse {
        row,
        reason: format!("column {} is not numeric: '{}'", column, field),
    })?;

    if !value.is_finite() {
        return Err(AcquisitionError::Parse {
            row,
            reason: format!("column {} is not finite: '{}'", column, field),
        });
    }

    Ok(value)
}

fn parse_label(field: &str, row: usize) -> Result<u8, AcquisitionError> {
    let value: f64 = field.parse().map_err(|_| AcquisitionError::Parse {
        row,
        reason: format!("label is not numeric: '{}'", field),
    })?;

    if value.fract() != 0.0 || !(0.0..=f64::from(u8::MAX)).contains(&value) {
        return Err(AcquisitionError::Parse {
            row,
            reason: format!("label is not a class number: '{}'", field),
        });
    }

    Ok(value as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_with_labels() {
        let data = "0.1,0.9,0.1,0.0\n0.2,0.8,0.2,2.0\n";
        let dataset = parse_beats(data.as_bytes(), 3).unwrap();

        assert_eq!(dataset.beat_count(), 2);
        assert_eq!(dataset.beat_len(), 3);
        assert_eq!(dataset.beats()[0].samples(), &[0.1, 0.9, 0.1]);
        assert_eq!(dataset.beats()[0].label(), Some(0));
        assert_eq!(dataset.beats()[1].label(), Some(2));
    }

    #[test]
    fn test_scientific_notation_and_whitespace() {
        let data = " 9.779411554336547852e-01 , 1.0e-02 ,1.000000000000000000e+00\n";
        let dataset = parse_beats(data.as_bytes(), 2).unwrap();
        assert!((dataset.beats()[0].samples()[0] - 0.9779411554336548).abs() < 1e-12);
        assert_eq!(dataset.beats()[0].label(), Some(1));
    }

    #[test]
    fn test_wrong_column_count() {
        let data = "0.1,0.9,0.1,0.0\n0.2,0.8,2.0\n";
        match parse_beats(data.as_bytes(), 3) {
            Err(AcquisitionError::Parse { row, reason }) => {
                assert_eq!(row, 2);
                assert!(reason.contains("expected 4 columns"));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_non_numeric_and_bad_label() {
        assert!(matches!(
            parse_beats("0.1,abc,0.0\n".as_bytes(), 2),
            Err(AcquisitionError::Parse { row: 1, .. })
        ));
        assert!(matches!(
            parse_beats("0.1,0.2,1.5\n".as_bytes(), 2),
            Err(AcquisitionError::Parse { row: 1, .. })
        ));
        assert!(matches!(
            parse_beats("0.1,NaN,1.0\n".as_bytes(), 2),
            Err(AcquisitionError::Parse { row: 1, .. })
        ));
    }

    #[test]
    fn test_empty_input_is_no_data() {
        assert!(matches!(
            parse_beats("".as_bytes(), 3),
            Err(AcquisitionError::NoData(_))
        ));
    }
}
