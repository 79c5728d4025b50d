//! CSV extraction: daily extracts into metric vectors, master files into tables.
//!
//! The daily extract has one row per (entity, item) pair. The `名称` column names
//! the sales channel and the `項目` column says whether the row carries amounts
//! (`金額`) or unit totals (`総本数`). Figure columns are found by header aliases
//! because the export has renamed them across versions.

use crate::error::{LedgerError, Result};
use crate::metrics::{slot, MetricVector, METRIC_COUNT};
use crate::schema::EngineConfig;
use crate::utils::{coerce_cell, parse_master_date, parse_number, MIN_PLAUSIBLE_YEAR};
use crate::{MasterTable, MonthKey, WorkingDays, WorkingDaysTable};
use chrono::Datelike;
use log::debug;

pub const NAME_HEADER: &str = "名称";
pub const ITEM_HEADER: &str = "項目";
pub const AMOUNT_ITEM: &str = "金額";
pub const QUANTITY_ITEM: &str = "総本数";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FigureColumn {
    Total,
    Dairy,
    Mid,
    PremiumChannelA,
    PremiumChannelB,
}

/// Ordered header candidates per figure column; the first one present wins.
/// Channel A's export labels the premium line in lower case, so its list
/// prefers that spelling while channel B keeps the historical `Y1000類` first.
const HEADER_ALIASES: [(FigureColumn, &[&str]); 5] = [
    (FigureColumn::Total, &["合　計", "合計"]),
    (FigureColumn::Dairy, &["乳製品計"]),
    (FigureColumn::Mid, &["Y400類"]),
    (
        FigureColumn::PremiumChannelA,
        &[
            "yakult1000類",
            "yakult1000",
            "Yakult1000類",
            "Y1000類",
            "Y1000",
            "Yakult1000",
            "Y1000本",
            "ｙａｋｕｌｔ１０００類",
            "Ｙ１０００類",
            "Ｙ１０００",
            "Ｙａｋｕｌｔ１０００類",
        ],
    ),
    (
        FigureColumn::PremiumChannelB,
        &["Y1000類", "Yakult1000類", "Y1000", "Yakult1000", "Y1000本", "yakult1000類"],
    ),
];

fn find_header_index(header: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|candidate| header.iter().position(|h| h == candidate))
}

/// Column positions resolved once per file.
#[derive(Debug, Clone, Default)]
struct ColumnMap {
    name: usize,
    item: usize,
    total: Option<usize>,
    dairy: Option<usize>,
    mid: Option<usize>,
    premium_a: Option<usize>,
    premium_b: Option<usize>,
}

impl ColumnMap {
    fn resolve(header: &[String]) -> Result<Self> {
        let name = header
            .iter()
            .position(|h| h == NAME_HEADER)
            .ok_or(LedgerError::MissingColumn(NAME_HEADER))?;
        let item = header
            .iter()
            .position(|h| h == ITEM_HEADER)
            .ok_or(LedgerError::MissingColumn(ITEM_HEADER))?;

        let mut map = ColumnMap {
            name,
            item,
            ..ColumnMap::default()
        };
        for (column, aliases) in HEADER_ALIASES {
            let idx = find_header_index(header, aliases);
            match column {
                FigureColumn::Total => map.total = idx,
                FigureColumn::Dairy => map.dairy = idx,
                FigureColumn::Mid => map.mid = idx,
                FigureColumn::PremiumChannelA => map.premium_a = idx,
                FigureColumn::PremiumChannelB => map.premium_b = idx,
            }
        }
        Ok(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    A,
    B,
}

#[derive(Debug, Clone, Copy, Default)]
struct FigureSet {
    total: f64,
    dairy: f64,
    mid: f64,
    premium: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct ChannelFigures {
    amount: FigureSet,
    quantity: FigureSet,
}

impl ChannelFigures {
    /// Writes this channel's seven slots starting at `base`.
    fn write_slots(&self, vector: &mut MetricVector, base: usize) {
        vector[base] = self.amount.total;
        vector[base + 1] = self.amount.dairy;
        vector[base + 2] = self.quantity.dairy;
        vector[base + 3] = self.amount.mid;
        vector[base + 4] = self.quantity.mid;
        vector[base + 5] = self.amount.premium;
        vector[base + 6] = self.quantity.premium;
    }
}

/// Reads raw CSV text into rows of cells. No header handling; ragged rows are kept.
pub fn read_rows(content: &str) -> Result<Vec<Vec<String>>> {
    let content = content.trim_start_matches('\u{feff}');
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

/// Maps one daily extract (header row first) into a metric vector.
///
/// Fails only when the name or item column is missing; rows for unknown
/// entities or items are ignored and absent figures read as 0.
pub fn extract_record(rows: &[Vec<String>], config: &EngineConfig) -> Result<MetricVector> {
    let header: Vec<String> = match rows.first() {
        Some(header) => header.iter().map(|h| h.trim().to_string()).collect(),
        None => return Err(LedgerError::MissingColumn(NAME_HEADER)),
    };
    let columns = ColumnMap::resolve(&header)?;

    let mut channel_a = ChannelFigures::default();
    let mut channel_b = ChannelFigures::default();

    for row in &rows[1..] {
        let cell = |idx: Option<usize>| coerce_cell(idx.and_then(|i| row.get(i)).map(String::as_str));

        let name = row.get(columns.name).map(|s| s.trim()).unwrap_or("");
        let channel = if name == config.channel_a_name {
            Channel::A
        } else if name == config.channel_b_name {
            Channel::B
        } else {
            continue;
        };

        let item: String = row
            .get(columns.item)
            .map(|s| s.chars().filter(|c| !c.is_whitespace()).collect())
            .unwrap_or_default();

        let figures = match channel {
            Channel::A => &mut channel_a,
            Channel::B => &mut channel_b,
        };
        let target = match item.as_str() {
            AMOUNT_ITEM => &mut figures.amount,
            QUANTITY_ITEM => &mut figures.quantity,
            _ => continue,
        };

        target.total = cell(columns.total);
        target.dairy = cell(columns.dairy);
        target.mid = cell(columns.mid);
        target.premium = match channel {
            Channel::A => cell(columns.premium_a),
            Channel::B => cell(columns.premium_b),
        };
    }

    let mut vector = MetricVector::zeros();
    channel_a.write_slots(&mut vector, slot::A_TOTAL_AMOUNT);
    channel_b.write_slots(&mut vector, slot::B_TOTAL_AMOUNT);
    vector[slot::ALL_TOTAL_AMOUNT] = channel_a.amount.total + channel_b.amount.total;
    vector[slot::ALL_DAIRY_AMOUNT] = channel_a.amount.dairy + channel_b.amount.dairy;
    vector[slot::ALL_DAIRY_QTY] = channel_a.quantity.dairy + channel_b.quantity.dairy;

    Ok(vector)
}

/// True when the first cell of the first row is not a date, i.e. a header row.
fn has_header_row(rows: &[Vec<String>]) -> bool {
    rows.first()
        .and_then(|row| row.first())
        .map(|cell| parse_master_date(cell).is_none())
        .unwrap_or(false)
}

/// Parses a target or prior-year master file: month column plus 17 metric columns.
pub fn parse_master_rows(rows: &[Vec<String>], source: &str) -> Result<MasterTable> {
    let start = usize::from(has_header_row(rows));
    let mut table = MasterTable::new();

    for (line, row) in rows.iter().enumerate().skip(start) {
        if row.len() < METRIC_COUNT + 1 || row[0].trim().is_empty() {
            debug!("{}: skipping short or unlabeled row {}", source, line + 1);
            continue;
        }
        let date = match parse_master_date(&row[0]) {
            Some(date) if date.year() >= MIN_PLAUSIBLE_YEAR => date,
            _ => {
                debug!("{}: skipping row {} with unusable month '{}'", source, line + 1, row[0]);
                continue;
            }
        };

        let mut values = MetricVector::zeros();
        for (idx, raw) in row[1..=METRIC_COUNT].iter().enumerate() {
            values[idx] = parse_number(raw);
        }
        table.insert(MonthKey::from_date(date), values);
    }

    if table.is_empty() {
        return Err(LedgerError::NoValidRows(source.to_string()));
    }
    Ok(table)
}

fn parse_day_count(raw: &str) -> f64 {
    parse_number(raw).max(0.0)
}

/// Parses the working-days master file: month, channel A days, channel B days.
pub fn parse_working_day_rows(rows: &[Vec<String>], source: &str) -> Result<WorkingDaysTable> {
    let start = usize::from(has_header_row(rows));
    let mut table = WorkingDaysTable::new();

    for (line, row) in rows.iter().enumerate().skip(start) {
        if row.len() < 3 {
            debug!("{}: skipping short row {}", source, line + 1);
            continue;
        }
        let Some(date) = parse_master_date(&row[0]) else {
            debug!("{}: skipping row {} with unusable month '{}'", source, line + 1, row[0]);
            continue;
        };

        table.insert(
            MonthKey::from_date(date),
            WorkingDays {
                channel_a: parse_day_count(&row[1]),
                channel_b: parse_day_count(&row[2]),
            },
        );
    }

    if table.is_empty() {
        return Err(LedgerError::NoValidRows(source.to_string()));
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAILY_CSV: &str = "\
名称,項目,合　計,乳製品計,Y400類,yakult1000類,Y1000類
営業計,金額,\"1,000\",400,200,300,999
営業計, 総 本 数 ,50,20,10,15,99
直販他計,金額,2000,800,300,100,500
直販他計,総本数,80,30,12,5,25
その他,金額,9999,9999,9999,9999,9999
営業計,値引,7777,7777,7777,7777,7777
";

    fn extract(csv_text: &str) -> Result<MetricVector> {
        let rows = read_rows(csv_text).unwrap();
        extract_record(&rows, &EngineConfig::default())
    }

    #[test]
    fn test_extracts_all_seventeen_slots() {
        let v = extract(DAILY_CSV).unwrap();

        assert_eq!(v[slot::A_TOTAL_AMOUNT], 1000.0);
        assert_eq!(v[slot::A_DAIRY_AMOUNT], 400.0);
        assert_eq!(v[slot::A_DAIRY_QTY], 20.0);
        assert_eq!(v[slot::A_MID_AMOUNT], 200.0);
        assert_eq!(v[slot::A_MID_QTY], 10.0);
        // Channel A reads the lower-case premium column first
        assert_eq!(v[slot::A_PREMIUM_AMOUNT], 300.0);
        assert_eq!(v[slot::A_PREMIUM_QTY], 15.0);

        assert_eq!(v[slot::B_TOTAL_AMOUNT], 2000.0);
        assert_eq!(v[slot::B_DAIRY_QTY], 30.0);
        // Channel B reads Y1000類 first
        assert_eq!(v[slot::B_PREMIUM_AMOUNT], 500.0);
        assert_eq!(v[slot::B_PREMIUM_QTY], 25.0);

        assert_eq!(v[slot::ALL_TOTAL_AMOUNT], 3000.0);
        assert_eq!(v[slot::ALL_DAIRY_AMOUNT], 1200.0);
        assert_eq!(v[slot::ALL_DAIRY_QTY], 50.0);
    }

    #[test]
    fn test_missing_name_and_item_columns_yield_no_record() {
        let result = extract("区分,種別,合計\nA,B,100\n");
        assert!(matches!(result, Err(LedgerError::MissingColumn(_))));

        let only_name = extract("名称,合計\n営業計,100\n");
        assert!(matches!(only_name, Err(LedgerError::MissingColumn(ITEM_HEADER))));

        assert!(extract("").is_err());
    }

    #[test]
    fn test_half_width_total_alias_and_missing_columns() {
        let csv_text = "名称 , 項目 ,合計\n営業計,金額,500\n直販他計,金額,250\n";
        let v = extract(csv_text).unwrap();
        assert_eq!(v[slot::A_TOTAL_AMOUNT], 500.0);
        assert_eq!(v[slot::A_DAIRY_AMOUNT], 0.0);
        assert_eq!(v[slot::A_PREMIUM_AMOUNT], 0.0);
        assert_eq!(v[slot::ALL_TOTAL_AMOUNT], 750.0);
    }

    #[test]
    fn test_company_total_equals_channel_sum() {
        for (a, b) in [("0", "0"), ("1,234", "5"), ("", "42"), ("x", "-10")] {
            let csv_text = format!(
                "名称,項目,合計\n営業計,金額,\"{}\"\n直販他計,金額,\"{}\"\n",
                a, b
            );
            let v = extract(&csv_text).unwrap();
            assert_eq!(
                v[slot::ALL_TOTAL_AMOUNT],
                v[slot::A_TOTAL_AMOUNT] + v[slot::B_TOTAL_AMOUNT]
            );
        }
    }

    #[test]
    fn test_blank_cells_default_to_zero() {
        let v = extract("名称,項目,合計,乳製品計\n営業計,金額,,\n").unwrap();
        assert_eq!(v, MetricVector::zeros());
    }

    #[test]
    fn test_parse_master_rows() {
        let mut csv_text = String::from("年月");
        for i in 0..METRIC_COUNT {
            csv_text.push_str(&format!(",m{}", i));
        }
        csv_text.push('\n');
        csv_text.push_str("2024/04/01,3000,1,5,0,0,0,0,0,0,0,0,0,0,0,0,0,0\n");
        csv_text.push_str("2024/05,\"4,000\",1,6,0,0,0,0,0,0,0,0,0,0,0,0,0,0\n");
        csv_text.push_str("1999/04/01,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1\n");
        csv_text.push_str("2024/06/01,1,2,3\n");
        csv_text.push_str(",1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1\n");

        let rows = read_rows(&csv_text).unwrap();
        let table = parse_master_rows(&rows, "target.csv").unwrap();

        assert_eq!(table.len(), 2);
        let apr = table.get(&MonthKey::new(2024, 4).unwrap()).unwrap();
        assert_eq!(apr[slot::A_TOTAL_AMOUNT], 3000.0);
        assert_eq!(apr[slot::A_DAIRY_QTY], 5.0);
        let may = table.get(&MonthKey::new(2024, 5).unwrap()).unwrap();
        assert_eq!(may[slot::A_TOTAL_AMOUNT], 4000.0);
    }

    #[test]
    fn test_parse_master_rows_without_header_or_valid_rows() {
        let row = "2024-04-01,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1,1\n";
        let rows = read_rows(row).unwrap();
        assert_eq!(parse_master_rows(&rows, "prev.csv").unwrap().len(), 1);

        let rows = read_rows("年月,a\nfoo,1\n").unwrap();
        assert!(matches!(
            parse_master_rows(&rows, "prev.csv"),
            Err(LedgerError::NoValidRows(_))
        ));
    }

    #[test]
    fn test_parse_working_day_rows() {
        let csv_text = "年月,稼働日_宅配,稼働日_直販\n2024/04/01,20,22\n2024/05,21.6,\n2024/06\n";
        let rows = read_rows(csv_text).unwrap();
        let table = parse_working_day_rows(&rows, "days.csv").unwrap();

        assert_eq!(table.len(), 2);
        let apr = table.get(&MonthKey::new(2024, 4).unwrap()).unwrap();
        assert_eq!(apr.channel_a, 20.0);
        assert_eq!(apr.channel_b, 22.0);
        let may = table.get(&MonthKey::new(2024, 5).unwrap()).unwrap();
        assert_eq!(may.channel_a, 21.6);
        assert_eq!(may.channel_b, 0.0);
    }

    #[test]
    fn test_working_day_counts_clamp_negatives() {
        let rows = read_rows("2024/04/01,-3,\"1,5\"\n").unwrap();
        let table = parse_working_day_rows(&rows, "days.csv").unwrap();
        let apr = table[&MonthKey::new(2024, 4).unwrap()];
        assert_eq!(apr.channel_a, 0.0);
        assert_eq!(apr.channel_b, 15.0);
    }
}
