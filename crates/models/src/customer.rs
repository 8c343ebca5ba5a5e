use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};

use crate::crud::{check_email, id_if_present, set_if_present, CrudEntity};
use crate::errors::ModelError;
use crate::user;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub userid: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::User => Entity::belongs_to(user::Entity).from(Column::Userid).to(user::Column::Id).into(),
        }
    }
}

impl Related<user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewCustomer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomerPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub userid: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl CrudEntity for Entity {
    const COLLECTION: &'static str = "customers";

    type Active = ActiveModel;
    type Input = NewCustomer;
    type Patch = CustomerPatch;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> i64 {
        model.id
    }

    fn input_id(input: &NewCustomer) -> Option<i64> {
        input.id
    }

    fn active_from_input(input: NewCustomer) -> ActiveModel {
        ActiveModel {
            id: id_if_present(input.id),
            userid: Set(input.userid),
            name: Set(input.name),
            email: Set(input.email),
        }
    }

    fn active_from_patch(patch: CustomerPatch) -> ActiveModel {
        ActiveModel {
            userid: set_if_present(patch.userid),
            name: set_if_present(patch.name),
            email: set_if_present(patch.email),
            ..Default::default()
        }
    }

    fn validate(input: &NewCustomer) -> Result<(), ModelError> {
        if let Some(id) = input.id.filter(|id| *id <= 0) {
            return Err(ModelError::Validation(format!("id must be positive, got {id}")));
        }
        check_email("email", input.email.as_deref())
    }

    fn validate_patch(patch: &CustomerPatch) -> Result<(), ModelError> {
        check_email("email", patch.email.as_deref())
    }
}
