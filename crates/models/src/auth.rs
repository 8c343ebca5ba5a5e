//! Login handles. Plain records: no credentials are stored or checked here.

use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};

use crate::crud::{id_if_present, set_if_present, CrudEntity};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "auths")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub userid: Option<i64>,
    pub username: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match *self {}
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl CrudEntity for Entity {
    const COLLECTION: &'static str = "auths";

    type Active = ActiveModel;
    type Input = NewAuth;
    type Patch = AuthPatch;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> i64 {
        model.id
    }

    fn input_id(input: &NewAuth) -> Option<i64> {
        input.id
    }

    fn active_from_input(input: NewAuth) -> ActiveModel {
        ActiveModel { id: id_if_present(input.id), userid: Set(input.userid), username: Set(input.username) }
    }

    fn active_from_patch(patch: AuthPatch) -> ActiveModel {
        ActiveModel {
            userid: set_if_present(patch.userid),
            username: set_if_present(patch.username),
            ..Default::default()
        }
    }
}
