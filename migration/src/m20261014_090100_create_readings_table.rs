use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table((Alias::new("telemetry"), Readings::Table))
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Readings::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Readings::RoomId).big_integer().not_null())
                    .col(ColumnDef::new(Readings::RoomType).string_len(64).not_null())
                    .col(ColumnDef::new(Readings::TemperatureC).double())
                    .col(ColumnDef::new(Readings::HumidityPct).double())
                    .col(ColumnDef::new(Readings::DifferentialPressurePa).double())
                    .col(
                        ColumnDef::new(Readings::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Serves the per-room newest-first scan in get_latest_readings_per_room
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE INDEX IF NOT EXISTS readings_room_id_recorded_at_idx
                ON telemetry.readings(room_id, recorded_at DESC)",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table((Alias::new("telemetry"), Readings::Table))
                    .if_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Readings {
    Table,
    Id,
    RoomId,
    RoomType,
    TemperatureC,
    HumidityPct,
    DifferentialPressurePa,
    RecordedAt,
}
