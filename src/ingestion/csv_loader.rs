//! CSV loader for the video-game sales dataset.
//!
//! Reads the Kaggle `Video_Games_Sales` layout and applies the coercion rules
//! while materializing the columnar snapshot.

use crate::error::{NlqError, NlqResult};
use crate::query::coerce::{coerce_float, coerce_integer, coerce_text, coerce_user_score, coerce_year};
use crate::storage::columnar::{GameRecord, GamesTable};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// One CSV row exactly as read; every field is raw text
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawGameRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Platform")]
    pub platform: String,
    #[serde(rename = "Year_of_Release", alias = "Year")]
    pub year_of_release: String,
    #[serde(rename = "Genre")]
    pub genre: String,
    #[serde(rename = "Publisher")]
    pub publisher: String,
    #[serde(rename = "NA_Sales")]
    pub na_sales: String,
    #[serde(rename = "EU_Sales")]
    pub eu_sales: String,
    #[serde(rename = "JP_Sales")]
    pub jp_sales: String,
    #[serde(rename = "Other_Sales")]
    pub other_sales: String,
    #[serde(rename = "Global_Sales")]
    pub global_sales: String,
    #[serde(rename = "Critic_Score")]
    pub critic_score: String,
    #[serde(rename = "Critic_Count")]
    pub critic_count: String,
    #[serde(rename = "User_Score")]
    pub user_score: String,
    #[serde(rename = "User_Count")]
    pub user_count: String,
    #[serde(rename = "Developer")]
    pub developer: String,
    #[serde(rename = "Rating")]
    pub rating: String,
}

impl RawGameRow {
    /// Apply coercion. Rows without a title carry no answerable fact and are dropped.
    pub fn into_record(self) -> Option<GameRecord> {
        let name = coerce_text(&self.name)?;
        Some(GameRecord {
            name,
            platform: coerce_text(&self.platform).unwrap_or_default(),
            year: coerce_year(&self.year_of_release),
            genre: coerce_text(&self.genre),
            publisher: coerce_text(&self.publisher),
            na_sales: coerce_float(&self.na_sales),
            eu_sales: coerce_float(&self.eu_sales),
            jp_sales: coerce_float(&self.jp_sales),
            other_sales: coerce_float(&self.other_sales),
            global_sales: coerce_float(&self.global_sales),
            critic_score: coerce_float(&self.critic_score),
            critic_count: coerce_integer(&self.critic_count),
            user_score: coerce_user_score(&self.user_score),
            user_count: coerce_integer(&self.user_count),
            developer: coerce_text(&self.developer),
            rating: coerce_text(&self.rating),
        })
    }
}

/// Read and coerce every record from a CSV source
pub fn read_records<R: Read>(reader: R) -> NlqResult<Vec<GameRecord>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for row in reader.deserialize::<RawGameRow>() {
        match row?.into_record() {
            Some(record) => records.push(record),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(skipped, "dropped rows without a title");
    }
    Ok(records)
}

/// Load the dataset snapshot from a CSV file
pub fn load_csv(path: impl AsRef<Path>) -> NlqResult<GamesTable> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| NlqError::io_with_path(e.to_string(), path.display().to_string()))?;
    let records = read_records(file)?;
    if records.is_empty() {
        return Err(NlqError::dataset("dataset has no rows").with_context(path.display().to_string()));
    }
    info!(rows = records.len(), path = %path.display(), "loaded games dataset");
    Ok(GamesTable::from_records(&records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::columnar::GameColumn;
    use crate::storage::value::Value;
    use std::io::Write;

    const SAMPLE: &str = "\
Name,Platform,Year_of_Release,Genre,Publisher,NA_Sales,EU_Sales,JP_Sales,Other_Sales,Global_Sales,Critic_Score,Critic_Count,User_Score,User_Count,Developer,Rating
Wii Sports,Wii,2006,Sports,Nintendo,41.36,28.96,3.77,8.45,82.53,76,51,8,322,Nintendo,E
Madden NFL 2004,PS2,N/A,Sports,Electronic Arts,4.26,0.26,0.01,0.71,5.23,94,29,8.5,140,EA Tiburon,E
Some Shovelware,DS,2008,Misc,Unknown,0.01,0,0,0,0.01,,,tbd,,,
,GB,1996,Puzzle,Nintendo,1,1,1,1,4,,,,,,
";

    #[test]
    fn test_read_records_applies_coercion() {
        let records = read_records(SAMPLE.as_bytes()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].year, Some(2006));
        assert_eq!(records[0].user_score, Some(8.0));
        assert_eq!(records[1].year, None);
        assert_eq!(records[2].user_score, None);
        assert_eq!(records[2].critic_count, None);
        assert_eq!(records[2].developer, None);
    }

    #[test]
    fn test_load_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let table = load_csv(file.path()).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.value(GameColumn::GlobalSales, 0), Value::Float64(82.53));
    }

    #[test]
    fn test_load_csv_missing_file_is_io_error() {
        let err = load_csv("/definitely/not/here.csv").unwrap_err();
        assert_eq!(err.category(), "io");
    }
}
