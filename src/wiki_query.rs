use crate::error::Result;
use crate::wiki_select::{DEFAULT_REGISTRY_TABLE, WikiFlag, WikiSelect};
use crate::wiki_store::WikiStore;
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::{debug, instrument};

pub const MAX_LIMIT: usize = 5000;

/// A named predicate over the status flags of a wiki.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WikiState {
    All,
    Closed,
    Inactive,
    Active,
    Private,
    Public,
    Deleted,
}

impl WikiState {
    pub const VALUES: [Self; 7] = [
        Self::All,
        Self::Closed,
        Self::Inactive,
        Self::Active,
        Self::Private,
        Self::Public,
        Self::Deleted,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Closed => "closed",
            Self::Inactive => "inactive",
            Self::Active => "active",
            Self::Private => "private",
            Self::Public => "public",
            Self::Deleted => "deleted",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::VALUES.into_iter().find(|s| s.as_str() == name)
    }

    /// The `(flag, value)` pairs a row must have to be in this state.
    /// `All` imposes nothing.
    pub const fn required_flags(&self) -> &'static [(WikiFlag, bool)] {
        match self {
            Self::All => &[],
            Self::Closed => &[(WikiFlag::Closed, true)],
            Self::Inactive => &[(WikiFlag::Inactive, true)],
            Self::Active => &[(WikiFlag::Closed, false), (WikiFlag::Inactive, false)],
            Self::Private => &[(WikiFlag::Private, true)],
            Self::Public => &[(WikiFlag::Private, false)],
            Self::Deleted => &[(WikiFlag::Deleted, true)],
        }
    }
}

/// An output column that can be requested via `siteprop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SiteProp {
    Url,
    Dbname,
    Sitename,
    LanguageCode,
}

impl SiteProp {
    pub const VALUES: [Self; 4] = [Self::Url, Self::Dbname, Self::Sitename, Self::LanguageCode];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Url => "url",
            Self::Dbname => "dbname",
            Self::Sitename => "sitename",
            Self::LanguageCode => "languagecode",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::VALUES.into_iter().find(|p| p.as_str() == name)
    }

    /// Column in the registry table.
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Url => "wiki_url",
            Self::Dbname => "wiki_dbname",
            Self::Sitename => "wiki_sitename",
            Self::LanguageCode => "wiki_language",
        }
    }
}

/// Direct mode materializes rows; generator mode hands back identifiers
/// for a paging layer to enumerate further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationMode {
    #[default]
    Direct,
    Generator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    pub states: BTreeSet<WikiState>,
    pub site_props: BTreeSet<SiteProp>,
    pub limit: usize,
    pub wikis_list: Option<BTreeSet<String>>,
    pub mode: InvocationMode,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            states: BTreeSet::from([WikiState::All]),
            site_props: SiteProp::VALUES.into_iter().collect(),
            limit: MAX_LIMIT,
            wikis_list: None,
            mode: InvocationMode::Direct,
        }
    }
}

impl QueryRequest {
    pub fn filters_by_state(&self) -> bool {
        !self.states.contains(&WikiState::All)
    }
}

/// One row of the registry table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WikiRecord {
    pub dbname: String,
    pub url: String,
    pub sitename: String,
    pub languagecode: String,
    pub closed: bool,
    pub inactive: bool,
    pub private: bool,
    pub deleted: bool,
}

impl WikiRecord {
    pub const fn flag(&self, flag: WikiFlag) -> bool {
        match flag {
            WikiFlag::Closed => self.closed,
            WikiFlag::Inactive => self.inactive,
            WikiFlag::Private => self.private,
            WikiFlag::Deleted => self.deleted,
        }
    }
}

/// A projected registry row: the identifier plus whatever was requested.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WikiRow {
    pub dbname: String,
    pub url: Option<String>,
    pub sitename: Option<String>,
    pub languagecode: Option<String>,
}

impl WikiRow {
    pub fn new(dbname: &str) -> Self {
        Self {
            dbname: dbname.to_string(),
            ..Default::default()
        }
    }

    pub fn set(&mut self, prop: SiteProp, value: Option<String>) {
        match prop {
            SiteProp::Url => self.url = value,
            SiteProp::Sitename => self.sitename = value,
            SiteProp::LanguageCode => self.languagecode = value,
            SiteProp::Dbname => {
                if let Some(dbname) = value {
                    self.dbname = dbname;
                }
            }
        }
    }

    pub fn to_json(&self) -> Value {
        let mut ret = json!({ "dbname": self.dbname });
        let optional = [
            (SiteProp::Url, &self.url),
            (SiteProp::Sitename, &self.sitename),
            (SiteProp::LanguageCode, &self.languagecode),
        ];
        for (prop, value) in optional {
            if let Some(value) = value {
                ret[prop.as_str()] = json!(value);
            }
        }
        ret
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryResult {
    Rows(Vec<WikiRow>),
    Identifiers(Vec<String>),
}

impl QueryResult {
    pub fn dbnames(&self) -> Vec<&str> {
        match self {
            Self::Rows(rows) => rows.iter().map(|r| r.dbname.as_str()).collect(),
            Self::Identifiers(ids) => ids.iter().map(|s| s.as_str()).collect(),
        }
    }
}

/// Turns a validated [`QueryRequest`] into a bounded read of the wiki registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiListQuery {
    table: String,
}

impl Default for WikiListQuery {
    fn default() -> Self {
        Self::new(DEFAULT_REGISTRY_TABLE)
    }
}

impl WikiListQuery {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Builds the SELECT for `request`. Generator mode only projects the
    /// identifier; conditions and limit are the same in both modes.
    pub fn build_select(&self, request: &QueryRequest) -> WikiSelect {
        let mut select = WikiSelect::new(&self.table);

        if request.filters_by_state() {
            for state in &request.states {
                for (flag, value) in state.required_flags() {
                    select.add_where_flag(*flag, *value);
                }
            }
        }

        if request.mode == InvocationMode::Direct {
            for prop in SiteProp::VALUES {
                select.add_field_if(prop, request.site_props.contains(&prop));
            }
        }

        select.set_limit(request.limit);

        if let Some(wikis) = &request.wikis_list {
            select.add_where_dbname_in(wikis.iter().cloned().collect());
        }

        select
    }

    #[instrument(skip_all, fields(mode = ?request.mode, limit = request.limit), err)]
    pub async fn execute(
        &self,
        store: &dyn WikiStore,
        request: &QueryRequest,
    ) -> Result<QueryResult> {
        let select = self.build_select(request);
        let rows = store.select(&select).await?;
        debug!(rows = rows.len(), "registry query done");
        Ok(match request.mode {
            InvocationMode::Direct => QueryResult::Rows(rows),
            InvocationMode::Generator => {
                QueryResult::Identifiers(rows.into_iter().map(|row| row.dbname).collect())
            }
        })
    }
}
