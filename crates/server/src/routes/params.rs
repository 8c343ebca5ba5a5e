//! Query-string parameters carrying JSON filter documents.

use models::filter::{Filter, FilterError, Where};
use serde::Deserialize;

/// `?filter={...}`
#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub filter: Option<String>,
}

impl FilterParams {
    pub fn parse(&self) -> Result<Filter, FilterError> {
        match self.filter.as_deref().map(str::trim) {
            None | Some("") => Ok(Filter::default()),
            Some(s) => Filter::from_json_str(s),
        }
    }
}

/// `?where={...}`
#[derive(Debug, Default, Deserialize)]
pub struct WhereParams {
    #[serde(rename = "where")]
    pub where_: Option<String>,
}

impl WhereParams {
    pub fn parse(&self) -> Result<Option<Where>, FilterError> {
        match self.where_.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => Where::from_json_str(s).map(Some),
        }
    }
}
