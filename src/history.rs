use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// A single finished conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub pdf_name: String,
    pub voice_category: String,
    pub download_url: String,
    pub timestamp: String,
}

/// Persistent log of finished conversions, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    #[serde(default)]
    pub entries: Vec<ConversionRecord>,
}

impl History {
    /// Directory: ~/.local/share/pdf-audiobook/
    fn dir() -> PathBuf {
        let mut p = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("pdf-audiobook");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("history.json")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::path())
    }

    /// Load from disk, returning defaults if missing.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(data) => serde_json::from_str(&data).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }

    pub fn record(&mut self, pdf_name: &str, voice_category: &str, download_url: &str) {
        self.entries.push(ConversionRecord {
            pdf_name: pdf_name.to_string(),
            voice_category: voice_category.to_string(),
            download_url: download_url.to_string(),
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        });
    }

    /// Entries grouped by calendar day (`YYYY-MM-DD`), newest day and newest entry first.
    pub fn by_day(&self) -> Vec<(&str, Vec<&ConversionRecord>)> {
        let mut days: Vec<(&str, Vec<&ConversionRecord>)> = Vec::new();
        for record in self.entries.iter().rev() {
            let day = record.day();
            match days.iter_mut().find(|(d, _)| *d == day) {
                Some((_, records)) => records.push(record),
                None => days.push((day, vec![record])),
            }
        }
        days
    }
}

impl ConversionRecord {
    /// Date part of the timestamp.
    pub fn day(&self) -> &str {
        self.timestamp
            .split_once(' ')
            .map_or(self.timestamp.as_str(), |(day, _)| day)
    }

    /// Time of day, without seconds.
    pub fn time_of_day(&self) -> &str {
        self.timestamp
            .split_once(' ')
            .map_or("", |(_, time)| time.get(..5).unwrap_or(time))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_then_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");

        let mut history = History::default();
        history.record("book.pdf", "British Female", "/download/a.mp3");
        history.record("notes.pdf", "American Male", "/download/b.mp3");
        history.save_to(&path).unwrap();

        let loaded = History::load_from(&path);
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].pdf_name, "book.pdf");
        assert_eq!(loaded.entries[1].voice_category, "American Male");
        assert_eq!(loaded.entries, history.entries);
    }

    fn entry(pdf_name: &str, timestamp: &str) -> ConversionRecord {
        ConversionRecord {
            pdf_name: pdf_name.into(),
            voice_category: "British Female".into(),
            download_url: format!("/download/{pdf_name}.mp3"),
            timestamp: timestamp.into(),
        }
    }

    #[test]
    fn groups_by_day_newest_first() {
        let history = History {
            entries: vec![
                entry("a", "2026-10-16 09:15:00"),
                entry("b", "2026-10-17 08:00:00"),
                entry("c", "2026-10-17 21:42:10"),
                entry("d", "2026-10-18 07:05:59"),
            ],
        };

        let days = history.by_day();
        let shape: Vec<(&str, Vec<&str>)> = days
            .iter()
            .map(|(day, records)| (*day, records.iter().map(|r| r.pdf_name.as_str()).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("2026-10-18", vec!["d"]),
                ("2026-10-17", vec!["c", "b"]),
                ("2026-10-16", vec!["a"]),
            ]
        );
        assert_eq!(days[1].1[0].time_of_day(), "21:42");
        assert!(History::default().by_day().is_empty());
    }

    #[test]
    fn odd_timestamp_is_its_own_day() {
        let odd = entry("x", "yesterday");
        assert_eq!(odd.day(), "yesterday");
        assert_eq!(odd.time_of_day(), "");
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, "{").unwrap();
        assert!(History::load_from(&path).entries.is_empty());
    }
}
