//! 房间解析服务。
//!
//! 为私聊对找到或创建唯一房间，验证并创建群聊，
//! 以及所有读/写操作前的成员授权检查。

use std::sync::Arc;

use domain::{DomainError, Room, RoomId, RoomKind, UserId};
use tokio::sync::Mutex;

use crate::boundary::Directory;
use crate::clock::Clock;
use crate::dto::RoomSummary;
use crate::error::ApplicationError;
use crate::store::RoomStore;

pub struct RoomResolverDependencies {
    pub room_store: Arc<dyn RoomStore>,
    pub directory: Arc<dyn Directory>,
    pub clock: Arc<dyn Clock>,
}

pub struct RoomResolver {
    deps: RoomResolverDependencies,
    /// 私聊对 find-or-create 的串行化点：并发解析同一无序对
    /// （无论方向）不会创建两个房间。
    pair_lock: Mutex<()>,
}

impl RoomResolver {
    pub fn new(deps: RoomResolverDependencies) -> Self {
        Self {
            deps,
            pair_lock: Mutex::new(()),
        }
    }

    /// 解析 requester 与 target 的私聊房间，不存在则创建。
    pub async fn resolve_private(
        &self,
        requester: &UserId,
        target: &UserId,
    ) -> Result<RoomId, ApplicationError> {
        if requester == target {
            return Err(DomainError::SelfChat.into());
        }
        if !self.deps.directory.exists(target).await? {
            return Err(DomainError::unknown_user(target.as_str()).into());
        }

        let _guard = self.pair_lock.lock().await;

        if let Some(existing) = self
            .deps
            .room_store
            .find_private_pair(requester, target)
            .await?
        {
            return Ok(existing.id);
        }

        let room = Room::new_private(
            RoomId::generate(),
            requester.clone(),
            target.clone(),
            self.deps.clock.now(),
        )?;
        let created = self.deps.room_store.create(room).await?;
        tracing::info!(room_id = %created.id, "私聊房间已创建");
        Ok(created.id)
    }

    /// 创建群聊。每个成员标识都要能在目录中解析，否则整个创建
    /// 被拒绝，不落任何部分状态；成员集为通过校验的成员加上发起人。
    pub async fn resolve_group_create(
        &self,
        requester: &UserId,
        name: &str,
        member_identifiers: &[UserId],
    ) -> Result<RoomId, ApplicationError> {
        let mut invalid = Vec::new();
        for member in member_identifiers {
            if !self.deps.directory.exists(member).await? {
                invalid.push(member.as_str().to_owned());
            }
        }
        if !invalid.is_empty() {
            return Err(DomainError::invalid_members(invalid).into());
        }

        let mut members = member_identifiers.to_vec();
        members.push(requester.clone());
        let room = Room::new_group(RoomId::generate(), name, members, self.deps.clock.now())?;
        let created = self.deps.room_store.create(room).await?;
        tracing::info!(
            room_id = %created.id,
            member_count = created.members.len(),
            "群聊房间已创建"
        );
        Ok(created.id)
    }

    /// join/read/send 前的授权门。对不存在与无权限的房间
    /// 分别返回 RoomNotFound 与 Forbidden，不泄漏更多信息。
    pub async fn authorize(
        &self,
        user: &UserId,
        room_id: RoomId,
    ) -> Result<Room, ApplicationError> {
        let room = self
            .deps
            .room_store
            .find_by_id(room_id)
            .await?
            .ok_or(DomainError::RoomNotFound)?;
        if !room.is_member(user) {
            return Err(DomainError::Forbidden.into());
        }
        Ok(room)
    }

    /// 用户的房间列表（首页视图）。私聊以对端显示名标注，
    /// 目录查不到时退回原始标识；群聊用群名。
    pub async fn list_rooms(&self, user: &UserId) -> Result<Vec<RoomSummary>, ApplicationError> {
        let rooms = self.deps.room_store.list_for_user(user).await?;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms {
            let label = match room.kind {
                RoomKind::Group => room.name.clone().unwrap_or_default(),
                RoomKind::Private => match room.peer_of(user) {
                    Some(peer) => self
                        .deps
                        .directory
                        .display_name(peer)
                        .await?
                        .unwrap_or_else(|| peer.as_str().to_owned()),
                    None => user.as_str().to_owned(),
                },
            };
            summaries.push(RoomSummary {
                id: room.id,
                kind: room.kind,
                label,
            });
        }
        Ok(summaries)
    }
}
