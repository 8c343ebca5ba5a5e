//! Create `users` table.
//!
//! `id` is a bigserial so the store can assign ids, but explicit ids are accepted.
use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(string_null(Users::Firstname))
                    .col(date_null(Users::Dob))
                    .col(string_null(Users::Middlename))
                    .col(string_null(Users::Lastname))
                    .col(string_null(Users::Email))
                    .col(string_null(Users::Phone))
                    .col(string_null(Users::Address))
                    .col(big_integer_null(Users::Customerid))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(Users::Table).to_owned()).await
    }
}

#[derive(DeriveIden)]
enum Users { Table, Id, Firstname, Dob, Middlename, Lastname, Email, Phone, Address, Customerid }
