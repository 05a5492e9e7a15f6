//! Hand-off formats for reporting and plotting collaborators.

use std::io::Write;

use serde::Serialize;
use tabled::settings::{Settings, Style};
use tabled::{Table, Tabled};

use crate::accumulation::AccumulationTable;
use crate::error::Result;
use crate::fit::FitResult;
use crate::registry::RegistryCollection;

/// Renders rows as a markdown table
pub fn render_table<I, T>(rows: I) -> String
where
    I: IntoIterator<Item = T>,
    T: Tabled,
{
    let table_config = Settings::default().with(Style::markdown());
    Table::new(rows).with(table_config).to_string()
}

#[derive(Serialize)]
struct AccumulationRecord<'a> {
    source: &'a str,
    num_exts: usize,
    num_uniq_exts: usize,
    percent_uniq_exts: f64,
    total_exts: usize,
    total_uniq_exts: usize,
    added_uniq_exts: usize,
    uniq_exts: String,
}

/// Writes the accumulation table as CSV, unique extensions joined by spaces
pub fn write_accumulation_csv<W: Write>(table: &AccumulationTable, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for row in table {
        csv.serialize(AccumulationRecord {
            source: &row.source,
            num_exts: row.num_exts,
            num_uniq_exts: row.num_uniq_exts,
            percent_uniq_exts: row.percent_uniq_exts,
            total_exts: row.total_exts,
            total_uniq_exts: row.total_uniq_exts,
            added_uniq_exts: row.added_uniq_exts,
            uniq_exts: row.uniq_exts.join(" "),
        })?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the evaluated curve as `x,y_fit,y_lower,y_upper` CSV rows
pub fn write_fit_csv<W: Write>(fit: &FitResult, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    for point in &fit.points {
        csv.serialize(point)?;
    }
    csv.flush()?;
    Ok(())
}

/// Writes the fit parameters and evaluated curve as pretty-printed JSON.
///
/// Infinite band bounds (two-point fits) are written as `null`.
pub fn write_fit_json<W: Write>(fit: &FitResult, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, fit)?;
    writer.flush()?;
    Ok(())
}

/// Writes the normalized registries as a JSON map of sorted extension arrays
pub fn write_extensions_json<W: Write>(registries: &RegistryCollection, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, registries)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulation::accumulate;
    use crate::fit::{fit_curve, FitDomain};
    use crate::registry::ExtensionSet;

    fn registries() -> RegistryCollection {
        [
            ("A", ["a", "b", "c"].iter().collect::<ExtensionSet>()),
            ("B", ["b", "c", "d", "e"].iter().collect::<ExtensionSet>()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_render_table() {
        let table = accumulate(&registries()).unwrap();
        let rendered = render_table(table.rows());
        assert!(rendered.contains("| source |"));
        assert!(rendered.contains("percent_uniq_exts"));
        assert!(rendered.contains("33.33"));
        assert!(!rendered.contains("d e"));
    }

    #[test]
    fn test_write_accumulation_csv() {
        let table = accumulate(&registries()).unwrap();
        let mut out = Vec::new();
        write_accumulation_csv(&table, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "source,num_exts,num_uniq_exts,percent_uniq_exts,total_exts,total_uniq_exts,added_uniq_exts,uniq_exts"
        );
        assert_eq!(lines[1], "B,4,2,50.0,4,4,4,d e");
        assert!(lines[2].starts_with("A,3,1,33.3"));
        assert!(lines[2].ends_with(",7,5,1,a"));
    }

    #[test]
    fn test_write_fit_outputs() {
        let fit = fit_curve(&[4, 7, 9], &[4, 5, 7], FitDomain::new(2, 50).unwrap(), 3, 1.96).unwrap();

        let mut csv_out = Vec::new();
        write_fit_csv(&fit, &mut csv_out).unwrap();
        let csv_text = String::from_utf8(csv_out).unwrap();
        assert!(csv_text.starts_with("x,y_fit,y_lower,y_upper\n2.0,"));
        assert_eq!(csv_text.lines().count(), 4);

        let mut json_out = Vec::new();
        write_fit_json(&fit, &mut json_out).unwrap();
        let parsed: FitResult = serde_json::from_slice(&json_out).unwrap();
        assert_eq!(parsed.points.len(), 3);
        assert!((parsed.a - fit.a).abs() < 1e-12);
    }

    #[test]
    fn test_write_fit_outputs_two_points() {
        let fit = fit_curve(&[4, 7], &[4, 5], FitDomain::new(2, 50).unwrap(), 3, 1.96).unwrap();

        let mut csv_out = Vec::new();
        write_fit_csv(&fit, &mut csv_out).unwrap();
        let csv_text = String::from_utf8(csv_out).unwrap();
        assert!(csv_text.lines().nth(1).unwrap().ends_with(",-inf,inf"));

        let mut json_out = Vec::new();
        write_fit_json(&fit, &mut json_out).unwrap();
        let parsed: FitResult = serde_json::from_slice(&json_out).unwrap();
        assert_eq!(parsed.points.len(), 3);
        for (read, written) in parsed.points.iter().zip(&fit.points) {
            assert_eq!(read.x, written.x);
            assert!((read.y_fit - written.y_fit).abs() < 1e-9);
            assert_eq!(read.y_lower, f64::NEG_INFINITY);
            assert_eq!(read.y_upper, f64::INFINITY);
        }
    }

    #[test]
    fn test_write_extensions_json() {
        let mut out = Vec::new();
        write_extensions_json(&registries(), &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["B"], serde_json::json!(["b", "c", "d", "e"]));
    }
}
