use std::fmt;
use std::str::FromStr;

/// Letter grade bands, declared lowest first so the derived ordering matches
/// `F < D < C < C+ < B < B+ < A < A+`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Grade {
    F,
    D,
    C,
    CPlus,
    B,
    BPlus,
    A,
    APlus,
}

impl Grade {
    pub const BANDS: [Grade; 7] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::CPlus,
        Grade::C,
        Grade::D,
    ];

    pub const ALL: [Grade; 8] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::CPlus,
        Grade::C,
        Grade::D,
        Grade::F,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .into_iter()
            .find(|grade| grade.label() == s)
            .ok_or_else(|| format!("unknown grade label `{s}`"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
    Grade(Grade),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            // Integral values keep one decimal so a score never reads as a count.
            Cell::Number(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Cell::Number(value) => write!(f, "{value}"),
            Cell::Grade(grade) => f.write_str(grade.label()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: Vec<(String, Cell)>,
}

pub type StudentRecord = Record;

pub type ReportRow = Record;

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    /// Replaces the cell in place when the column exists, appends otherwise.
    pub fn set(&mut self, column: &str, cell: Cell) {
        match self.cells.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = cell,
            None => self.cells.push((column.to_string(), cell)),
        }
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().map(|(_, cell)| cell)
    }

    pub fn text(&self, column: &str) -> String {
        self.get(column).map(Cell::to_string).unwrap_or_default()
    }
}

impl<S: Into<String>> FromIterator<(S, Cell)> for Record {
    fn from_iter<I: IntoIterator<Item = (S, Cell)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (column, cell) in iter {
            record.set(&column.into(), cell);
        }
        record
    }
}

/// Consecutive report rows that share one primary key value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentGroup {
    pub key: String,
    pub rows: Vec<ReportRow>,
}

impl StudentGroup {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_failure(&self) -> bool {
        self.rows
            .iter()
            .any(|row| matches!(row.get("Grade"), Some(Cell::Grade(Grade::F))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grades_order_from_f_to_a_plus() {
        assert!(Grade::F < Grade::D);
        assert!(Grade::C < Grade::CPlus);
        assert!(Grade::BPlus < Grade::A);
        assert!(Grade::A < Grade::APlus);
    }

    #[test]
    fn grade_labels_parse_back() {
        for grade in Grade::ALL {
            assert_eq!(grade.label().parse::<Grade>(), Ok(grade));
        }
        assert!("E".parse::<Grade>().is_err());
    }

    #[test]
    fn numbers_print_with_full_precision() {
        assert_eq!(Cell::Number(40.0).to_string(), "40.0");
        assert_eq!(Cell::Number(2.5).to_string(), "2.5");
        assert_eq!(
            Cell::Number(100.0 / 3.0).to_string(),
            "33.333333333333336"
        );
        assert_eq!(Cell::Grade(Grade::BPlus).to_string(), "B+");
    }

    #[test]
    fn set_overwrites_without_reordering() {
        let mut record: Record = [
            ("name", Cell::Text("Avery".into())),
            ("hw", Cell::Text("8".into())),
        ]
        .into_iter()
        .collect();
        record.set("hw", Cell::Number(40.0));
        record.set("Total", Cell::Number(40.0));

        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["name", "hw", "Total"]);
        assert_eq!(record.get("hw"), Some(&Cell::Number(40.0)));
        assert_eq!(record.text("missing"), "");
    }

    #[test]
    fn group_fails_when_any_row_is_f() {
        let pass: Record = [("Grade", Cell::Grade(Grade::B))].into_iter().collect();
        let fail: Record = [("Grade", Cell::Grade(Grade::F))].into_iter().collect();
        let group = StudentGroup {
            key: "1".into(),
            rows: vec![pass.clone(), fail],
        };
        assert!(group.has_failure());

        let group = StudentGroup {
            key: "1".into(),
            rows: vec![pass],
        };
        assert!(!group.has_failure());
    }
}
