use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_items_table::Migration),
            Box::new(m20240301_000002_create_bom_lines_table::Migration),
        ]
    }
}

mod m20240301_000001_create_items_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Items::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Items::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Items::SequenceNo).big_integer().not_null())
                        .col(ColumnDef::new(Items::Division).string_len(1).not_null())
                        .col(ColumnDef::new(Items::IndustryCode).string_len(1).not_null())
                        .col(ColumnDef::new(Items::PartGroup).string_len(3).not_null())
                        .col(
                            ColumnDef::new(Items::Revision)
                                .string_len(1)
                                .not_null()
                                .default("A"),
                        )
                        .col(ColumnDef::new(Items::ElectronicCode).string().not_null())
                        .col(ColumnDef::new(Items::ItemName).string().not_null())
                        .col(
                            ColumnDef::new(Items::ItemType)
                                .string()
                                .not_null()
                                .default("제품"),
                        )
                        .col(
                            ColumnDef::new(Items::Status)
                                .string()
                                .not_null()
                                .default("양산"),
                        )
                        .col(ColumnDef::new(Items::Unit).string().not_null().default("EA"))
                        .col(ColumnDef::new(Items::Model).string().not_null().default(""))
                        .col(
                            ColumnDef::new(Items::AccountCode)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Items::Note).string().not_null().default(""))
                        .col(ColumnDef::new(Items::Author).string().not_null().default(""))
                        .col(
                            ColumnDef::new(Items::RegisteredAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Items::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            // These two indexes are what turn a racing create into DuplicateKey.
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_items_sequence_no")
                        .table(Items::Table)
                        .col(Items::SequenceNo)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_items_electronic_code")
                        .table(Items::Table)
                        .col(Items::ElectronicCode)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_items_classification")
                        .table(Items::Table)
                        .col(Items::Division)
                        .col(Items::IndustryCode)
                        .col(Items::PartGroup)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Items::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Items {
        Table,
        Id,
        SequenceNo,
        Division,
        IndustryCode,
        PartGroup,
        Revision,
        ElectronicCode,
        ItemName,
        ItemType,
        Status,
        Unit,
        Model,
        AccountCode,
        Note,
        Author,
        RegisteredAt,
        UpdatedAt,
        Version,
    }
}

mod m20240301_000002_create_bom_lines_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_bom_lines_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key to items: lines may reference codes that do not exist.
            manager
                .create_table(
                    Table::create()
                        .table(BomLines::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(BomLines::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(BomLines::LineNo)
                                .big_integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(BomLines::Industry)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(BomLines::Model).string().not_null().default(""))
                        .col(
                            ColumnDef::new(BomLines::ItemType)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(BomLines::Level)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(BomLines::ParentCode)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(BomLines::ElectronicCode).string().not_null())
                        .col(ColumnDef::new(BomLines::ItemName).string().not_null())
                        .col(
                            ColumnDef::new(BomLines::Quantity)
                                .decimal_len(16, 4)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(BomLines::Unit).string().not_null().default("EA"))
                        .col(
                            ColumnDef::new(BomLines::Process)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(BomLines::Note).string().not_null().default(""))
                        .col(
                            ColumnDef::new(BomLines::Author)
                                .string()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(BomLines::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BomLines::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BomLines::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bom_lines_line_no")
                        .table(BomLines::Table)
                        .col(BomLines::LineNo)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bom_lines_parent_code")
                        .table(BomLines::Table)
                        .col(BomLines::ParentCode)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bom_lines_electronic_code")
                        .table(BomLines::Table)
                        .col(BomLines::ElectronicCode)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BomLines::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BomLines {
        Table,
        Id,
        LineNo,
        Industry,
        Model,
        ItemType,
        Level,
        ParentCode,
        ElectronicCode,
        ItemName,
        Quantity,
        Unit,
        Process,
        Note,
        Author,
        CreatedAt,
        UpdatedAt,
        Version,
    }
}
