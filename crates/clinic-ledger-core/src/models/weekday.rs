//! Attendance weekday vocabulary.
//!
//! The internal code (`MONDAY`, ...) is what storage persists; the display
//! label (`Segunda-feira`, ...) is what forms and spreadsheets show. The two
//! are converted through explicit tables and never stand in for each other.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed weekday on which a patient usually attends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeekDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl WeekDay {
    /// All weekdays in calendar order, starting on Monday.
    pub const ALL: [WeekDay; 7] = [
        WeekDay::Monday,
        WeekDay::Tuesday,
        WeekDay::Wednesday,
        WeekDay::Thursday,
        WeekDay::Friday,
        WeekDay::Saturday,
        WeekDay::Sunday,
    ];

    /// Storage code.
    pub fn code(&self) -> &'static str {
        match self {
            WeekDay::Monday => "MONDAY",
            WeekDay::Tuesday => "TUESDAY",
            WeekDay::Wednesday => "WEDNESDAY",
            WeekDay::Thursday => "THURSDAY",
            WeekDay::Friday => "FRIDAY",
            WeekDay::Saturday => "SATURDAY",
            WeekDay::Sunday => "SUNDAY",
        }
    }

    /// Parse a storage code. Exact match only.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|day| day.code() == code)
    }

    /// Localized display label.
    pub fn label(&self) -> &'static str {
        match self {
            WeekDay::Monday => "Segunda-feira",
            WeekDay::Tuesday => "Terça-feira",
            WeekDay::Wednesday => "Quarta-feira",
            WeekDay::Thursday => "Quinta-feira",
            WeekDay::Friday => "Sexta-feira",
            WeekDay::Saturday => "Sábado",
            WeekDay::Sunday => "Domingo",
        }
    }

    /// Resolve a display label typed by a person or read from a sheet.
    ///
    /// Matching ignores surrounding whitespace, letter case and accents, so
    /// `"sabado"`, `"SÁBADO"` and `" Sábado "` all resolve to Saturday.
    /// Partial labels such as `"quinta"` do not match.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = fold_label(label);
        Self::ALL
            .into_iter()
            .find(|day| fold_label(day.label()) == wanted)
    }
}

impl fmt::Display for WeekDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Trim, lower-case and strip Portuguese diacritics.
fn fold_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
