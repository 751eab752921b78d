use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::StringRecord;

const CONNECTED_ON_FORMATS: [&str; 4] = ["%d %b %Y", "%d %B %Y", "%Y-%m-%d", "%m/%d/%Y"];

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionRecord {
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub company: String,
    pub profile_url: String,
    pub connected_on_raw: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerProfile {
    pub first_name: String,
    pub last_name: String,
    pub headline: String,
    pub summary: String,
    pub industry: String,
}

impl OwnerProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_owned()
    }

    pub fn is_empty(&self) -> bool {
        self.headline.is_empty() && self.summary.is_empty() && self.industry.is_empty()
    }
}

/// Malformed or missing dates fall back to the Unix epoch.
pub fn epoch_sentinel() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub fn parse_connected_on(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();
    CONNECTED_ON_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(epoch_sentinel)
}

struct Columns {
    header: StringRecord,
}

impl Columns {
    fn find(&self, name: &str) -> Option<usize> {
        self.header
            .iter()
            .position(|column| column.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(name))
    }

    fn get(&self, row: &StringRecord, name: &str) -> String {
        self.find(name)
            .and_then(|index| row.get(index))
            .map(|value| value.trim().to_owned())
            .unwrap_or_default()
    }
}

fn is_connections_header(record: &StringRecord) -> bool {
    record
        .get(0)
        .map(|first| first.trim().trim_start_matches('\u{feff}'))
        .is_some_and(|first| first.eq_ignore_ascii_case("First Name"))
}

pub fn parse_connections(reader: impl Read) -> Result<Vec<ConnectionRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut columns = None;
    let mut records = Vec::new();
    let mut undated = 0usize;

    for row in csv_reader.records() {
        let row = row.context("invalid CSV row in connections export")?;

        if columns.is_none() {
            if is_connections_header(&row) {
                columns = Some(Columns { header: row });
            }
            continue;
        }
        let Some(columns) = columns.as_ref() else {
            continue;
        };

        if row.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let record = ConnectionRecord {
            first_name: columns.get(&row, "First Name"),
            last_name: columns.get(&row, "Last Name"),
            role: columns.get(&row, "Position"),
            company: columns.get(&row, "Company"),
            profile_url: columns.get(&row, "URL"),
            connected_on_raw: columns.get(&row, "Connected On"),
        };
        if parse_connected_on(&record.connected_on_raw) == epoch_sentinel() {
            undated += 1;
        }
        records.push(record);
    }

    if columns.is_none() {
        log::warn!("connections export has no `First Name` header row; no connections loaded");
    }
    if undated > 0 {
        log::warn!("{undated} connection(s) have an unreadable `Connected On` date");
    }

    Ok(records)
}

pub fn read_connections(path: &Path) -> Result<Vec<ConnectionRecord>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open connections export {}", path.display()))?;
    let records = parse_connections(file)
        .with_context(|| format!("failed to read connections export {}", path.display()))?;
    log::info!("loaded {} connections from {}", records.len(), path.display());
    Ok(records)
}

pub fn parse_profile(reader: impl Read) -> Result<OwnerProfile> {
    let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let header = csv_reader
        .headers()
        .context("invalid CSV header in profile export")?
        .clone();
    let columns = Columns { header };

    let Some(row) = csv_reader.records().next() else {
        return Ok(OwnerProfile::default());
    };
    let row = row.context("invalid CSV row in profile export")?;

    Ok(OwnerProfile {
        first_name: columns.get(&row, "First Name"),
        last_name: columns.get(&row, "Last Name"),
        headline: columns.get(&row, "Headline"),
        summary: columns.get(&row, "Summary"),
        industry: columns.get(&row, "Industry"),
    })
}

pub fn read_profile(path: &Path) -> Result<OwnerProfile> {
    let file = File::open(path)
        .with_context(|| format!("failed to open profile export {}", path.display()))?;
    parse_profile(file).with_context(|| format!("failed to read profile export {}", path.display()))
}

#[cfg(test)]
mod tests {
    use chrono::Datelike;

    use super::*;

    const EXPORT: &str = "\
Notes:
\"When exporting your connection data, you may notice that some of the email addresses are missing.\"

First Name,Last Name,URL,Email Address,Company,Position,Connected On
Ada,Lovelace,https://example.com/in/ada,,Analytical Engines,Mathematician,14 Mar 2021
Grace,Hopper,,,Navy,\"Rear Admiral, Ret.\",2020-07-01
Alan,Turing,,,,,someday
";

    #[test]
    fn test_skips_preamble_and_reads_rows() {
        let records = parse_connections(EXPORT.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].first_name, "Ada");
        assert_eq!(records[0].profile_url, "https://example.com/in/ada");
        assert_eq!(records[1].role, "Rear Admiral, Ret.");
        assert_eq!(records[2].company, "");
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(parse_connected_on("14 Mar 2021").year(), 2021);
        assert_eq!(parse_connected_on("2020-07-01").month(), 7);
        assert_eq!(parse_connected_on("12/31/2019").day(), 31);
        assert_eq!(parse_connected_on("14 March 2021").month(), 3);
    }

    #[test]
    fn test_bad_dates_degrade_to_epoch() {
        assert_eq!(parse_connected_on("someday"), epoch_sentinel());
        assert_eq!(parse_connected_on(""), epoch_sentinel());
        assert_eq!(parse_connected_on("31 Feb 2021"), epoch_sentinel());
    }

    #[test]
    fn test_missing_header_yields_no_records() {
        let records = parse_connections("just,some,text\n1,2,3\n".as_bytes()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_profile_reads_first_row() {
        let raw = "First Name,Last Name,Headline,Summary,Industry\nRuth,Teitelbaum,Programmer,ENIAC work,Computing\n";
        let profile = parse_profile(raw.as_bytes()).unwrap();
        assert_eq!(profile.full_name(), "Ruth Teitelbaum");
        assert_eq!(profile.industry, "Computing");
        assert!(!profile.is_empty());
    }

    #[test]
    fn test_profile_without_rows_is_empty() {
        let profile = parse_profile("Headline,Summary\n".as_bytes()).unwrap();
        assert!(profile.is_empty());
    }
}
