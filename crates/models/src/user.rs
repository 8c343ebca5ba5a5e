use sea_orm::{entity::prelude::*, ActiveValue::Set};
use serde::{Deserialize, Serialize};

use crate::crud::{check_email, id_if_present, set_if_present, CrudEntity};
use crate::errors::ModelError;
use crate::{customer, role};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub firstname: Option<String>,
    pub dob: Option<Date>,
    pub middlename: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customerid: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Role,
    Customer,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Role => Entity::has_one(role::Entity).into(),
            Relation::Customer => Entity::has_one(customer::Entity).into(),
        }
    }
}

impl Related<role::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Role.def()
    }
}

impl Related<customer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Customer.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Create / replace body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customerid: Option<i64>,
}

/// Partial update body; absent and `null` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<Date>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub middlename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customerid: Option<i64>,
}

impl CrudEntity for Entity {
    const COLLECTION: &'static str = "users";

    type Active = ActiveModel;
    type Input = NewUser;
    type Patch = UserPatch;

    fn id_column() -> Column {
        Column::Id
    }

    fn id_of(model: &Model) -> i64 {
        model.id
    }

    fn input_id(input: &NewUser) -> Option<i64> {
        input.id
    }

    fn active_from_input(input: NewUser) -> ActiveModel {
        ActiveModel {
            id: id_if_present(input.id),
            firstname: Set(input.firstname),
            dob: Set(input.dob),
            middlename: Set(input.middlename),
            lastname: Set(input.lastname),
            email: Set(input.email),
            phone: Set(input.phone),
            address: Set(input.address),
            customerid: Set(input.customerid),
        }
    }

    fn active_from_patch(patch: UserPatch) -> ActiveModel {
        ActiveModel {
            firstname: set_if_present(patch.firstname),
            dob: set_if_present(patch.dob),
            middlename: set_if_present(patch.middlename),
            lastname: set_if_present(patch.lastname),
            email: set_if_present(patch.email),
            phone: set_if_present(patch.phone),
            address: set_if_present(patch.address),
            customerid: set_if_present(patch.customerid),
            ..Default::default()
        }
    }

    fn validate(input: &NewUser) -> Result<(), ModelError> {
        if let Some(id) = input.id.filter(|id| *id <= 0) {
            return Err(ModelError::Validation(format!("id must be positive, got {id}")));
        }
        check_email("email", input.email.as_deref())
    }

    fn validate_patch(patch: &UserPatch) -> Result<(), ModelError> {
        check_email("email", patch.email.as_deref())
    }
}
