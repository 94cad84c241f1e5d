use crate::sql_utils::{SQLtuple, append_sql, prep_quote};
use crate::wiki_query::{SiteProp, WikiRecord, WikiRow};
use mysql_async as my;
use mysql_async::Value as MyValue;

pub const DEFAULT_REGISTRY_TABLE: &str = "cw_wikis";

/// Boolean status columns of the registry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WikiFlag {
    Closed,
    Inactive,
    Private,
    Deleted,
}

impl WikiFlag {
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Closed => "wiki_closed",
            Self::Inactive => "wiki_inactive",
            Self::Private => "wiki_private",
            Self::Deleted => "wiki_deleted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Flag(WikiFlag, bool),
    DbnameIn(Vec<String>),
}

impl Condition {
    pub fn to_sql(&self) -> SQLtuple {
        match self {
            Self::Flag(flag, value) => (
                format!("{}=?", flag.column()),
                vec![MyValue::Int(i64::from(*value))],
            ),
            Self::DbnameIn(dbnames) => {
                let (placeholders, values) = prep_quote(dbnames);
                if values.is_empty() {
                    // `IN ()` is a syntax error; an empty list matches nothing
                    ("0=1".to_string(), vec![])
                } else {
                    (
                        format!("{} IN ({placeholders})", SiteProp::Dbname.column()),
                        values,
                    )
                }
            }
        }
    }

    pub fn matches(&self, record: &WikiRecord) -> bool {
        match self {
            Self::Flag(flag, value) => record.flag(*flag) == *value,
            Self::DbnameIn(dbnames) => dbnames
                .iter()
                .map(|s| s.trim())
                .any(|s| !s.is_empty() && s == record.dbname),
        }
    }
}

/// A single-table SELECT against the wiki registry. Conditions are AND-ed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiSelect {
    table: String,
    columns: Vec<SiteProp>,
    conditions: Vec<Condition>,
    limit: usize,
}

impl WikiSelect {
    /// The identifier column is always selected, and always first.
    pub fn new(table: &str) -> Self {
        Self {
            table: table.replace('`', ""),
            columns: vec![SiteProp::Dbname],
            conditions: vec![],
            limit: crate::wiki_query::MAX_LIMIT,
        }
    }

    pub fn add_field_if(&mut self, prop: SiteProp, condition: bool) {
        if condition && !self.columns.contains(&prop) {
            self.columns.push(prop);
        }
    }

    pub fn add_where_flag(&mut self, flag: WikiFlag, value: bool) {
        self.conditions.push(Condition::Flag(flag, value));
    }

    pub fn add_where_dbname_in(&mut self, dbnames: Vec<String>) {
        self.conditions.push(Condition::DbnameIn(dbnames));
    }

    pub const fn set_limit(&mut self, limit: usize) {
        self.limit = limit;
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[SiteProp] {
        &self.columns
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    pub fn to_sql(&self) -> SQLtuple {
        let columns = self
            .columns
            .iter()
            .map(|c| c.column())
            .collect::<Vec<&str>>()
            .join(",");
        let mut sql: SQLtuple = (format!("SELECT {columns} FROM `{}`", self.table), vec![]);
        for (num, condition) in self.conditions.iter().enumerate() {
            sql.0 += if num == 0 { " WHERE " } else { " AND " };
            append_sql(&mut sql, condition.to_sql());
        }
        sql.0 += " LIMIT ?";
        sql.1.push(MyValue::UInt(self.limit as u64));
        sql
    }

    pub fn matches(&self, record: &WikiRecord) -> bool {
        self.conditions.iter().all(|c| c.matches(record))
    }

    pub fn project(&self, record: &WikiRecord) -> WikiRow {
        let mut row = WikiRow::new(&record.dbname);
        for prop in &self.columns {
            let value = match prop {
                SiteProp::Url => &record.url,
                SiteProp::Dbname => &record.dbname,
                SiteProp::Sitename => &record.sitename,
                SiteProp::LanguageCode => &record.languagecode,
            };
            row.set(*prop, Some(value.to_owned()));
        }
        row
    }

    /// Maps a result row of [`Self::to_sql`] back to a [`WikiRow`].
    /// Returns `None` if the identifier column is missing or NULL.
    pub fn row_from_mysql(&self, row: &my::Row) -> Option<WikiRow> {
        let dbname = Self::string_from_row(row, 0)?;
        let mut ret = WikiRow::new(&dbname);
        for (col_num, prop) in self.columns.iter().enumerate().skip(1) {
            ret.set(*prop, Self::string_from_row(row, col_num));
        }
        Some(ret)
    }

    fn string_from_row(row: &my::Row, col_num: usize) -> Option<String> {
        match row.get(col_num)? {
            my::Value::Bytes(uv) => Some(String::from_utf8_lossy(&uv).into_owned()),
            _ => None,
        }
    }
}
