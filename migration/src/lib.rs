pub use sea_orm_migration::prelude::*;

mod m20261014_090000_create_schema;
mod m20261014_090100_create_readings_table;
mod m20261014_090200_add_latest_readings_function;
mod m20261014_090300_add_readings_notify_trigger;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261014_090000_create_schema::Migration),
            Box::new(m20261014_090100_create_readings_table::Migration),
            Box::new(m20261014_090200_add_latest_readings_function::Migration),
            Box::new(m20261014_090300_add_readings_notify_trigger::Migration),
        ]
    }
}
