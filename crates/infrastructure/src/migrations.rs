/// 内嵌的数据库迁移，启动时由 main 执行。
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");
