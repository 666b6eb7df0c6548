//! PostgreSQL 端口实现。
//!
//! 记录结构体通过 `TryFrom` 转回领域类型；所有 sqlx 错误统一
//! 映射为 `RepositoryError::Storage`。

use async_trait::async_trait;
use domain::{Message, RepositoryError, Room, RoomId, RoomKind, Timestamp, UserId};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use application::boundary::Directory;
use application::store::{MessageStore, NewMessage, RoomStore};

pub async fn create_pg_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
}

fn map_sqlx_err(err: sqlx::Error) -> RepositoryError {
    RepositoryError::storage(err.to_string())
}

fn invalid_data(message: impl Into<String>) -> RepositoryError {
    RepositoryError::storage(message)
}

#[derive(Debug, FromRow)]
struct RoomRecord {
    id: Uuid,
    kind: String,
    name: Option<String>,
    created_at: OffsetDateTime,
}

impl RoomRecord {
    fn into_room(self, member_ids: Vec<String>) -> Result<Room, RepositoryError> {
        let kind = match self.kind.as_str() {
            "private" => RoomKind::Private,
            "group" => RoomKind::Group,
            other => return Err(invalid_data(format!("unknown room kind: {other}"))),
        };
        let members = member_ids
            .into_iter()
            .map(|id| UserId::parse(id).map_err(|err| invalid_data(err.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Room {
            id: RoomId::from(self.id),
            kind,
            members,
            name: self.name,
            created_at: self.created_at,
        })
    }
}

fn kind_as_str(kind: RoomKind) -> &'static str {
    match kind {
        RoomKind::Private => "private",
        RoomKind::Group => "group",
    }
}

#[derive(Debug, FromRow)]
struct MessageRecord {
    room_id: Uuid,
    sequence: i64,
    sender: String,
    sender_name: String,
    body: String,
    created_at: OffsetDateTime,
}

impl TryFrom<MessageRecord> for Message {
    type Error = RepositoryError;

    fn try_from(value: MessageRecord) -> Result<Self, Self::Error> {
        let sender =
            UserId::parse(value.sender).map_err(|err| invalid_data(err.to_string()))?;
        Ok(Message {
            room_id: RoomId::from(value.room_id),
            sequence: value.sequence as u64,
            sender,
            sender_name: value.sender_name,
            body: value.body,
            created_at: value.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_members(&self, room_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String,)>(
            r#"SELECT user_id FROM room_members WHERE room_id = $1 ORDER BY user_id"#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn create(&self, room: Room) -> Result<Room, RepositoryError> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_err)?;

        sqlx::query(
            r#"INSERT INTO rooms (id, kind, name, created_at) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(Uuid::from(room.id))
        .bind(kind_as_str(room.kind))
        .bind(room.name.as_deref())
        .bind(room.created_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_err)?;

        for member in &room.members {
            sqlx::query(r#"INSERT INTO room_members (room_id, user_id) VALUES ($1, $2)"#)
                .bind(Uuid::from(room.id))
                .bind(member.as_str())
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_err)?;
        }

        tx.commit().await.map_err(map_sqlx_err)?;
        Ok(room)
    }

    async fn find_by_id(&self, id: RoomId) -> Result<Option<Room>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"SELECT id, kind, name, created_at FROM rooms WHERE id = $1"#,
        )
        .bind(Uuid::from(id))
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match record {
            Some(record) => {
                let members = self.load_members(record.id).await?;
                record.into_room(members).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn find_private_pair(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Room>, RepositoryError> {
        let record = sqlx::query_as::<_, RoomRecord>(
            r#"
            SELECT r.id, r.kind, r.name, r.created_at
            FROM rooms r
            JOIN room_members m1 ON m1.room_id = r.id AND m1.user_id = $1
            JOIN room_members m2 ON m2.room_id = r.id AND m2.user_id = $2
            WHERE r.kind = 'private'
            "#,
        )
        .bind(a.as_str())
        .bind(b.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        match record {
            Some(record) => {
                let members = self.load_members(record.id).await?;
                record.into_room(members).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, user: &UserId) -> Result<Vec<Room>, RepositoryError> {
        let records = sqlx::query_as::<_, RoomRecord>(
            r#"
            SELECT r.id, r.kind, r.name, r.created_at
            FROM rooms r
            JOIN room_members m ON m.room_id = r.id
            WHERE m.user_id = $1
            ORDER BY r.created_at
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        let mut rooms = Vec::with_capacity(records.len());
        for record in records {
            let members = self.load_members(record.id).await?;
            rooms.push(record.into_room(members)?);
        }
        Ok(rooms)
    }
}

#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn append(&self, message: NewMessage, at: Timestamp) -> Result<Message, RepositoryError> {
        // 序列号取房间当前最大值加一；同一房间的追加由分发器的
        // 房间锁串行化，子查询在这里不会竞争
        let record = sqlx::query_as::<_, MessageRecord>(
            r#"
            INSERT INTO messages (room_id, sequence, sender, sender_name, body, created_at)
            VALUES (
                $1,
                (SELECT COALESCE(MAX(sequence), 0) + 1 FROM messages WHERE room_id = $1),
                $2, $3, $4, $5
            )
            RETURNING room_id, sequence, sender, sender_name, body, created_at
            "#,
        )
        .bind(Uuid::from(message.room_id))
        .bind(message.sender.as_str())
        .bind(&message.sender_name)
        .bind(&message.body)
        .bind(at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        Message::try_from(record)
    }

    async fn history(&self, room_id: RoomId) -> Result<Vec<Message>, RepositoryError> {
        let records = sqlx::query_as::<_, MessageRecord>(
            r#"
            SELECT room_id, sequence, sender, sender_name, body, created_at
            FROM messages
            WHERE room_id = $1
            ORDER BY sequence
            "#,
        )
        .bind(Uuid::from(room_id))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        records.into_iter().map(Message::try_from).collect()
    }
}

/// 用户目录的数据库适配器。users 表由外部注册流程写入，这里只读。
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgDirectory {
    async fn exists(&self, identifier: &UserId) -> Result<bool, RepositoryError> {
        let row = sqlx::query_as::<_, (String,)>(r#"SELECT email FROM users WHERE email = $1"#)
            .bind(identifier.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.is_some())
    }

    async fn display_name(
        &self,
        identifier: &UserId,
    ) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query_as::<_, (String,)>(r#"SELECT name FROM users WHERE email = $1"#)
            .bind(identifier.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(row.map(|(name,)| name))
    }
}
