use std::sync::Arc;

use partlake_config::{LakeConfig, ScheduleConfig, TablesConfig};
use partlake_core::{Result, TableRef};
use partlake_query::QueryRunner;

/// Everything the scheduled functions need, built once per process.
#[derive(Clone)]
pub struct FunctionContext {
    runner: Arc<QueryRunner>,
    database: String,
    tables: TablesConfig,
    schedule: ScheduleConfig,
}

impl FunctionContext {
    pub fn new(runner: Arc<QueryRunner>, config: &LakeConfig) -> Self {
        Self {
            runner,
            database: config.query.database.clone(),
            tables: config.tables.clone(),
            schedule: config.schedule.clone(),
        }
    }

    pub fn runner(&self) -> &QueryRunner {
        &self.runner
    }

    pub fn tables(&self) -> &TablesConfig {
        &self.tables
    }

    pub fn schedule(&self) -> &ScheduleConfig {
        &self.schedule
    }

    pub(crate) fn table(&self, name: &str) -> Result<TableRef> {
        TableRef::new(&self.database, name)
    }
}
