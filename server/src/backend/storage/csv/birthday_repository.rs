use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::connection::CsvConnection;
use crate::backend::domain::models::birthday::{Birthday, CalendarDate};
use crate::backend::storage::traits::BirthdayStorage;

const HEADERS: [&str; 10] = [
    "id",
    "name",
    "date",
    "is_lunar",
    "reminder_days_before",
    "enabled",
    "relationship",
    "notes",
    "sort_order",
    "created_at",
];

/// One row of `birthdays.csv`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct BirthdayRecord {
    id: u64,
    name: String,
    date: String,
    is_lunar: bool,
    reminder_days_before: u32,
    enabled: bool,
    #[serde(default)]
    relationship: String,
    #[serde(default)]
    notes: String,
    #[serde(default)]
    sort_order: i32,
    created_at: String,
}

impl BirthdayRecord {
    fn from_domain(birthday: &Birthday) -> Self {
        Self {
            id: birthday.id,
            name: birthday.name.clone(),
            date: birthday.calendar_date.format(),
            is_lunar: birthday.calendar_date.is_lunar,
            reminder_days_before: birthday.reminder_days_before,
            enabled: birthday.enabled,
            relationship: birthday.relationship.clone(),
            notes: birthday.notes.clone(),
            sort_order: birthday.sort_order,
            created_at: birthday.created_at.to_rfc3339(),
        }
    }

    fn into_domain(self) -> Result<Birthday> {
        let calendar_date = CalendarDate::parse(&self.date, self.is_lunar)
            .with_context(|| format!("Birthday {} has an invalid date '{}'", self.id, self.date))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("Birthday {} has an invalid created_at '{}'", self.id, self.created_at))?
            .with_timezone(&Utc);

        Ok(Birthday {
            id: self.id,
            name: self.name,
            calendar_date,
            reminder_days_before: self.reminder_days_before,
            enabled: self.enabled,
            relationship: self.relationship,
            notes: self.notes,
            sort_order: self.sort_order,
            created_at,
        })
    }
}

/// Contents of `birthdays.csv`.
///
/// Rows that fail to parse are hidden from callers but written back verbatim,
/// and their ids stay reserved.
#[derive(Default)]
struct BirthdayTable {
    birthdays: Vec<Birthday>,
    unreadable: Vec<StringRecord>,
}

impl BirthdayTable {
    fn highest_id(&self) -> u64 {
        let readable = self.birthdays.iter().map(|b| b.id);
        let unreadable = self
            .unreadable
            .iter()
            .filter_map(|record| record.get(0)?.trim().parse::<u64>().ok());
        readable.chain(unreadable).max().unwrap_or(0)
    }
}

/// CSV-based birthday repository; every write rewrites the whole file.
///
/// Ids come from a counter in `next_id.txt` and are never handed out
/// twice, even after the newest record is deleted.
#[derive(Clone)]
pub struct BirthdayRepository {
    connection: CsvConnection,
    write_lock: Arc<Mutex<()>>,
}

impl BirthdayRepository {
    pub fn new(connection: CsvConnection) -> Self {
        Self {
            connection,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read all birthdays from the CSV file, skipping rows that fail to parse
    fn read_birthdays(&self) -> Result<Vec<Birthday>> {
        let mut birthdays = self.read_table()?.birthdays;
        sort_for_display(&mut birthdays);
        Ok(birthdays)
    }

    fn read_table(&self) -> Result<BirthdayTable> {
        let file_path = self.connection.birthdays_file_path();
        if !file_path.exists() {
            debug!("No birthdays file at {}, starting empty", file_path.display());
            return Ok(BirthdayTable::default());
        }

        let file = File::open(&file_path)
            .with_context(|| format!("Failed to open {}", file_path.display()))?;
        let mut csv_reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(BufReader::new(file));
        let headers = csv_reader
            .headers()
            .with_context(|| format!("Failed to read the header of {}", file_path.display()))?
            .clone();

        let mut table = BirthdayTable::default();
        for (row, result) in csv_reader.records().enumerate() {
            // A row the CSV layer cannot even split could not be written back
            let record = result.with_context(|| {
                format!("Birthday row {} of {} is corrupt", row + 1, file_path.display())
            })?;

            let parsed = record
                .deserialize::<BirthdayRecord>(Some(&headers))
                .map_err(anyhow::Error::from)
                .and_then(BirthdayRecord::into_domain);
            match parsed {
                Ok(birthday) => table.birthdays.push(birthday),
                Err(e) => {
                    warn!("Skipping unreadable birthday row {}: {:#}", row + 1, e);
                    table.unreadable.push(record);
                }
            }
        }

        Ok(table)
    }

    /// Write the table to the CSV file via a temp file and rename
    fn write_table(&self, table: &BirthdayTable) -> Result<()> {
        let file_path = self.connection.birthdays_file_path();
        write_atomically(&file_path, |file| {
            let mut csv_writer = WriterBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_writer(BufWriter::new(file));
            csv_writer.write_record(HEADERS)?;
            for birthday in &table.birthdays {
                csv_writer.serialize(BirthdayRecord::from_domain(birthday))?;
            }
            for record in &table.unreadable {
                csv_writer.write_record(record)?;
            }
            csv_writer.flush()?;
            Ok(())
        })
    }

    /// Next id from the counter file; 1 when no id was ever assigned
    fn read_next_id(&self) -> Result<u64> {
        let path = self.connection.next_id_file_path();
        if !path.exists() {
            return Ok(1);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        content
            .trim()
            .parse::<u64>()
            .with_context(|| format!("Invalid id counter '{}' in {}", content.trim(), path.display()))
    }

    fn write_next_id(&self, next_id: u64) -> Result<()> {
        write_atomically(&self.connection.next_id_file_path(), |mut file| {
            writeln!(file, "{}", next_id)?;
            Ok(())
        })
    }
}

/// Write `path` through a sibling temp file so readers never see a partial file
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    let temp_path = path.with_extension("tmp");
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to open {}", temp_path.display()))?;
    write(file).with_context(|| format!("Failed to write {}", temp_path.display()))?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

fn sort_for_display(birthdays: &mut [Birthday]) {
    birthdays.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
}

#[async_trait]
impl BirthdayStorage for BirthdayRepository {
    async fn list_birthdays(&self) -> Result<Vec<Birthday>> {
        self.read_birthdays()
    }

    async fn list_enabled(&self) -> Result<Vec<Birthday>> {
        Ok(self
            .read_birthdays()?
            .into_iter()
            .filter(|birthday| birthday.enabled)
            .collect())
    }

    async fn get_birthday(&self, id: u64) -> Result<Option<Birthday>> {
        Ok(self.read_birthdays()?.into_iter().find(|birthday| birthday.id == id))
    }

    async fn insert_birthday(&self, mut birthday: Birthday) -> Result<Birthday> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.read_table()?;
        birthday.id = self.read_next_id()?.max(table.highest_id() + 1);
        // Counter first: a failed data write may skip an id but never reuses one
        self.write_next_id(birthday.id + 1)?;

        table.birthdays.push(birthday.clone());
        self.write_table(&table)?;

        info!("Stored birthday {} with ID {}", birthday.name, birthday.id);
        Ok(birthday)
    }

    async fn update_birthday(&self, birthday: &Birthday) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.read_table()?;
        let Some(existing) = table.birthdays.iter_mut().find(|b| b.id == birthday.id) else {
            return Ok(false);
        };
        *existing = birthday.clone();
        self.write_table(&table)?;

        debug!("Updated birthday {}", birthday.id);
        Ok(true)
    }

    async fn delete_birthday(&self, id: u64) -> Result<bool> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.read_table()?;
        let before = table.birthdays.len();
        table.birthdays.retain(|birthday| birthday.id != id);
        if table.birthdays.len() == before {
            return Ok(false);
        }

        self.write_table(&table)?;
        info!("Deleted birthday {}", id);
        Ok(true)
    }

    async fn update_sort_orders(&self, ordered_ids: &[u64]) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut table = self.read_table()?;
        for birthday in table.birthdays.iter_mut() {
            if let Some(position) = ordered_ids.iter().position(|id| *id == birthday.id) {
                birthday.sort_order = i32::try_from(position).unwrap_or(i32::MAX);
            }
        }
        self.write_table(&table)?;
        Ok(())
    }
}
