use serde::{Deserialize, Serialize};

use crate::errors::DomainError;
use crate::value_objects::{RoomId, Timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomKind {
    Private,
    Group,
}

/// 房间实体。
///
/// 私聊房间恰好两名不同成员，且任意无序成员对至多一个私聊房间
/// （由 RoomResolver 的串行化创建保证）。成员集建立后不再变化，
/// 也没有房间删除路径。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub kind: RoomKind,
    pub members: Vec<UserId>,
    /// 群聊显示名，私聊为 None
    pub name: Option<String>,
    pub created_at: Timestamp,
}

impl Room {
    pub fn new_private(
        id: RoomId,
        a: UserId,
        b: UserId,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        if a == b {
            return Err(DomainError::SelfChat);
        }
        Ok(Self {
            id,
            kind: RoomKind::Private,
            members: vec![a, b],
            name: None,
            created_at,
        })
    }

    pub fn new_group(
        id: RoomId,
        name: impl Into<String>,
        members: Vec<UserId>,
        created_at: Timestamp,
    ) -> Result<Self, DomainError> {
        let name = Self::validate_name(name.into())?;
        let mut deduped: Vec<UserId> = Vec::with_capacity(members.len());
        for member in members {
            if !deduped.contains(&member) {
                deduped.push(member);
            }
        }
        if deduped.is_empty() {
            return Err(DomainError::invalid_argument("members", "cannot be empty"));
        }
        Ok(Self {
            id,
            kind: RoomKind::Group,
            members: deduped,
            name: Some(name),
            created_at,
        })
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    /// 私聊房间里 `user` 的对端。
    pub fn peer_of(&self, user: &UserId) -> Option<&UserId> {
        if self.kind != RoomKind::Private {
            return None;
        }
        self.members.iter().find(|m| *m != user)
    }

    fn validate_name(name: String) -> Result<String, DomainError> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument("room_name", "cannot be empty"));
        }
        if trimmed.len() > 60 {
            return Err(DomainError::invalid_argument("room_name", "too long"));
        }
        Ok(trimmed.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn uid(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    #[test]
    fn private_room_rejects_same_member_twice() {
        let err = Room::new_private(
            RoomId::generate(),
            uid("a@x.com"),
            uid("a@x.com"),
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::SelfChat);
    }

    #[test]
    fn group_members_are_deduplicated() {
        let room = Room::new_group(
            RoomId::generate(),
            "team",
            vec![uid("a@x.com"), uid("b@x.com"), uid("a@x.com")],
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        assert_eq!(room.members.len(), 2);
    }

    #[test]
    fn group_name_is_validated() {
        let err = Room::new_group(
            RoomId::generate(),
            "   ",
            vec![uid("a@x.com")],
            OffsetDateTime::now_utc(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument { .. }));
    }

    #[test]
    fn peer_of_returns_the_other_member() {
        let room = Room::new_private(
            RoomId::generate(),
            uid("a@x.com"),
            uid("b@x.com"),
            OffsetDateTime::now_utc(),
        )
        .unwrap();
        assert_eq!(room.peer_of(&uid("a@x.com")), Some(&uid("b@x.com")));
        assert_eq!(room.peer_of(&uid("b@x.com")), Some(&uid("a@x.com")));
    }
}
