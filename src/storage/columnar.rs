use crate::storage::value::Value;
use arrow::array::*;
use arrow::datatypes::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// The sixteen columns of the games dataset, in file order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameColumn {
    Name,
    Platform,
    YearOfRelease,
    Genre,
    Publisher,
    NaSales,
    EuSales,
    JpSales,
    OtherSales,
    GlobalSales,
    CriticScore,
    CriticCount,
    UserScore,
    UserCount,
    Developer,
    Rating,
}

impl GameColumn {
    pub const ALL: [GameColumn; 16] = [
        GameColumn::Name,
        GameColumn::Platform,
        GameColumn::YearOfRelease,
        GameColumn::Genre,
        GameColumn::Publisher,
        GameColumn::NaSales,
        GameColumn::EuSales,
        GameColumn::JpSales,
        GameColumn::OtherSales,
        GameColumn::GlobalSales,
        GameColumn::CriticScore,
        GameColumn::CriticCount,
        GameColumn::UserScore,
        GameColumn::UserCount,
        GameColumn::Developer,
        GameColumn::Rating,
    ];

    /// Column name as it appears in the CSV header and in compiled SQL
    pub fn name(self) -> &'static str {
        match self {
            GameColumn::Name => "Name",
            GameColumn::Platform => "Platform",
            GameColumn::YearOfRelease => "Year_of_Release",
            GameColumn::Genre => "Genre",
            GameColumn::Publisher => "Publisher",
            GameColumn::NaSales => "NA_Sales",
            GameColumn::EuSales => "EU_Sales",
            GameColumn::JpSales => "JP_Sales",
            GameColumn::OtherSales => "Other_Sales",
            GameColumn::GlobalSales => "Global_Sales",
            GameColumn::CriticScore => "Critic_Score",
            GameColumn::CriticCount => "Critic_Count",
            GameColumn::UserScore => "User_Score",
            GameColumn::UserCount => "User_Count",
            GameColumn::Developer => "Developer",
            GameColumn::Rating => "Rating",
        }
    }

    /// Case-insensitive lookup by column name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn data_type(self) -> DataType {
        match self {
            GameColumn::YearOfRelease | GameColumn::CriticCount | GameColumn::UserCount => DataType::Int64,
            c if c.is_sales() => DataType::Float64,
            GameColumn::CriticScore | GameColumn::UserScore => DataType::Float64,
            _ => DataType::Utf8,
        }
    }

    pub fn is_sales(self) -> bool {
        matches!(
            self,
            GameColumn::NaSales
                | GameColumn::EuSales
                | GameColumn::JpSales
                | GameColumn::OtherSales
                | GameColumn::GlobalSales
        )
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// One typed dataset row after coercion.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub name: String,
    pub platform: String,
    pub year: Option<i64>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub na_sales: Option<f64>,
    pub eu_sales: Option<f64>,
    pub jp_sales: Option<f64>,
    pub other_sales: Option<f64>,
    pub global_sales: Option<f64>,
    pub critic_score: Option<f64>,
    pub critic_count: Option<i64>,
    pub user_score: Option<f64>,
    pub user_count: Option<i64>,
    pub developer: Option<String>,
    pub rating: Option<String>,
}

impl GameRecord {
    /// Minimal record used by fixtures and tests
    pub fn new(name: impl Into<String>, platform: impl Into<String>, year: Option<i64>) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
            year,
            ..Default::default()
        }
    }
}

/// Immutable columnar snapshot of the games table.
/// Built once from coerced records and shared read-only behind an `Arc`.
#[derive(Clone, Debug)]
pub struct GamesTable {
    /// Column arrays in `GameColumn` order
    columns: Vec<ArrayRef>,

    /// Schema describing the columns
    schema: SchemaRef,

    row_count: usize,
}

impl GamesTable {
    pub fn from_records(records: &[GameRecord]) -> Self {
        let columns: Vec<ArrayRef> = vec![
            text_column(records, |r| Some(r.name.as_str())),
            text_column(records, |r| Some(r.platform.as_str())),
            int_column(records, |r| r.year),
            text_column(records, |r| r.genre.as_deref()),
            text_column(records, |r| r.publisher.as_deref()),
            float_column(records, |r| r.na_sales),
            float_column(records, |r| r.eu_sales),
            float_column(records, |r| r.jp_sales),
            float_column(records, |r| r.other_sales),
            float_column(records, |r| r.global_sales),
            float_column(records, |r| r.critic_score),
            int_column(records, |r| r.critic_count),
            float_column(records, |r| r.user_score),
            int_column(records, |r| r.user_count),
            text_column(records, |r| r.developer.as_deref()),
            text_column(records, |r| r.rating.as_deref()),
        ];

        Self {
            columns,
            schema: Self::games_schema(),
            row_count: records.len(),
        }
    }

    pub fn games_schema() -> SchemaRef {
        let fields: Vec<Field> = GameColumn::ALL
            .iter()
            .map(|c| Field::new(c.name(), c.data_type(), *c != GameColumn::Name))
            .collect();
        Arc::new(Schema::new(fields))
    }

    pub fn schema(&self) -> SchemaRef {
        self.schema.clone()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Read one cell
    pub fn value(&self, column: GameColumn, row: usize) -> Value {
        let array = &self.columns[column.index()];
        if row >= array.len() || array.is_null(row) {
            return Value::Null;
        }
        if let Some(a) = array.as_any().downcast_ref::<StringArray>() {
            Value::String(a.value(row).to_string())
        } else if let Some(a) = array.as_any().downcast_ref::<Float64Array>() {
            Value::Float64(a.value(row))
        } else if let Some(a) = array.as_any().downcast_ref::<Int64Array>() {
            Value::Int64(a.value(row))
        } else {
            Value::Null
        }
    }

    /// Title of a row without allocating
    pub fn title(&self, row: usize) -> &str {
        self.columns[GameColumn::Name.index()]
            .as_any()
            .downcast_ref::<StringArray>()
            .filter(|a| row < a.len() && !a.is_null(row))
            .map(|a| a.value(row))
            .unwrap_or("")
    }

    /// Distinct titles in first-occurrence order
    pub fn distinct_titles(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        (0..self.row_count)
            .map(|row| self.title(row))
            .filter(|t| !t.is_empty() && seen.insert(*t))
            .collect()
    }
}

fn text_column(records: &[GameRecord], f: fn(&GameRecord) -> Option<&str>) -> ArrayRef {
    Arc::new(StringArray::from(records.iter().map(f).collect::<Vec<_>>()))
}

fn float_column(records: &[GameRecord], f: fn(&GameRecord) -> Option<f64>) -> ArrayRef {
    Arc::new(Float64Array::from(records.iter().map(f).collect::<Vec<_>>()))
}

fn int_column(records: &[GameRecord], f: fn(&GameRecord) -> Option<i64>) -> ArrayRef {
    Arc::new(Int64Array::from(records.iter().map(f).collect::<Vec<_>>()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> GamesTable {
        let mut wii = GameRecord::new("Wii Sports", "Wii", Some(2006));
        wii.global_sales = Some(82.53);
        wii.user_score = Some(8.0);
        let mut gta = GameRecord::new("Grand Theft Auto V", "PS3", Some(2013));
        gta.global_sales = Some(21.04);
        let gta4 = GameRecord::new("Grand Theft Auto V", "X360", None);
        GamesTable::from_records(&[wii, gta, gta4])
    }

    #[test]
    fn test_value_reads_typed_cells() {
        let table = sample();
        assert_eq!(table.value(GameColumn::Name, 0), Value::from("Wii Sports"));
        assert_eq!(table.value(GameColumn::YearOfRelease, 1), Value::Int64(2013));
        assert_eq!(table.value(GameColumn::GlobalSales, 0), Value::Float64(82.53));
        assert_eq!(table.value(GameColumn::YearOfRelease, 2), Value::Null);
        assert_eq!(table.value(GameColumn::Developer, 0), Value::Null);
    }

    #[test]
    fn test_distinct_titles_keep_first_occurrence_order() {
        let table = sample();
        assert_eq!(table.distinct_titles(), vec!["Wii Sports", "Grand Theft Auto V"]);
    }

    #[test]
    fn test_column_lookup_is_case_insensitive() {
        assert_eq!(GameColumn::from_name("global_sales"), Some(GameColumn::GlobalSales));
        assert_eq!(GameColumn::from_name("year_of_release"), Some(GameColumn::YearOfRelease));
        assert_eq!(GameColumn::from_name("price"), None);
        assert_eq!(GamesTable::games_schema().fields().len(), 16);
    }
}
